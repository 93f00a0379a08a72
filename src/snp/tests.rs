use crate::sequence::{Record, GAP};
use crate::snp::{InputError, SnpMatrix, SubAlignment};
use color_eyre::eyre::{Report, Result};

fn ids(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("s{i}")).collect()
}

#[test]
fn from_alignment_keeps_variable_columns() -> Result<(), Report> {
    let records = vec![
        Record::new("s1", b"AACGTA"),
        Record::new("s2", b"AATGTA"),
        Record::new("s3", b"AACGNA"),
    ];
    let matrix = SnpMatrix::from_alignment(&records)?;

    // column 3 (C/T) and column 5 (T/gap)
    assert_eq!(matrix.positions(), [3, 5]);
    assert_eq!(matrix.row(1), [b'T', b'T']);
    assert_eq!(matrix.row(2), [b'C', GAP]);
    Ok(())
}

#[test]
fn from_alignment_invariant() -> Result<(), Report> {
    let records = vec![Record::new("s1", b"ACGT"), Record::new("s2", b"ACGT")];
    let matrix = SnpMatrix::from_alignment(&records)?;
    assert_eq!(matrix.num_sites(), 0);
    assert!(matrix.view()?.is_degenerate());
    Ok(())
}

#[test]
fn from_alignment_unequal_lengths() {
    let records = vec![Record::new("s1", b"ACGT"), Record::new("s2", b"ACG")];
    let error = SnpMatrix::from_alignment(&records).unwrap_err();
    assert!(matches!(error.downcast_ref::<InputError>(), Some(InputError::LengthMismatch { .. })));
}

#[test]
fn new_rejects_malformed() {
    let empty = SnpMatrix::new(Vec::new(), Vec::new(), Vec::new()).unwrap_err();
    assert_eq!(empty.downcast_ref::<InputError>(), Some(&InputError::Empty));

    let mismatch = SnpMatrix::new(ids(2), vec![1, 2], vec![b"AC".to_vec(), b"A".to_vec()]).unwrap_err();
    assert!(matches!(
        mismatch.downcast_ref::<InputError>(),
        Some(InputError::SiteCountMismatch { found: 1, expected: 2, .. })
    ));

    let duplicate = SnpMatrix::new(
        vec!["s1".into(), "s1".into()],
        vec![1],
        vec![b"A".to_vec(), b"C".to_vec()],
    )
    .unwrap_err();
    assert_eq!(duplicate.downcast_ref::<InputError>(), Some(&InputError::DuplicateId("s1".into())));

    let rows = SnpMatrix::new(ids(3), vec![1], vec![b"A".to_vec(), b"C".to_vec()]).unwrap_err();
    assert!(matches!(rows.downcast_ref::<InputError>(), Some(InputError::RowCountMismatch { .. })));
}

#[test]
fn sub_alignment_restricts_sites() -> Result<(), Report> {
    let matrix = SnpMatrix::new(
        ids(4),
        vec![5, 9, 12],
        vec![b"ACG".to_vec(), b"ACT".to_vec(), b"TAG".to_vec(), b"TAT".to_vec()],
    )?;

    let all = matrix.view()?;
    assert_eq!(all.num_sites(), 3);
    assert_eq!(all.codes(2), [1, 0, 0]);

    // members 0 and 1 only differ at the third column
    let sub = SubAlignment::new(&matrix, vec![0, 1])?;
    assert_eq!(sub.num_sites(), 1);
    assert_eq!(sub.sites()[0].position, 12);
    assert_eq!(sub.sites()[0].alphabet, b"GT");
    assert_eq!(sub.codes(0), [0]);
    assert_eq!(sub.codes(1), [1]);
    assert_eq!(sub.cells(), 2);
    Ok(())
}

#[test]
fn sub_alignment_rejects_bad_members() -> Result<(), Report> {
    let matrix = SnpMatrix::new(ids(2), vec![1], vec![b"A".to_vec(), b"C".to_vec()])?;

    let empty = SubAlignment::new(&matrix, Vec::new()).unwrap_err();
    assert_eq!(empty.downcast_ref::<InputError>(), Some(&InputError::Empty));

    let range = SubAlignment::new(&matrix, vec![0, 2]).unwrap_err();
    assert_eq!(
        range.downcast_ref::<InputError>(),
        Some(&InputError::MemberOutOfRange { member: 2, sequences: 2 })
    );
    Ok(())
}

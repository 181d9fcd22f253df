use super::*;
use crate::update::UpdateSession;
use crate::{Error, Fatal};

const SIGNATURE: [u8; SIGNATURE_SIZE] = [0x22; SIGNATURE_SIZE];

#[test]
fn invalid_sizes_are_rejected_before_erasing() {
    for size in [0, APP_MAX_SIZE as u32 + 1, u32::MAX] {
        let mut board = FakeBoard::new();
        assert_eq!(
            UpdateSession::init(&mut board, size, &DIGEST, &SIGNATURE),
            Err(Error::Size(size))
        );
        assert!(board.calls.is_empty());
    }
}

#[test]
fn largest_app_is_accepted() {
    let mut board = FakeBoard::new();
    let session = UpdateSession::init(&mut board, APP_MAX_SIZE as u32, &DIGEST, &SIGNATURE).unwrap();
    assert_eq!(session.size(), APP_MAX_SIZE as u32);
    assert_eq!(session.offset(), 0);
    assert!(!session.is_complete());
    assert!(board.slot.iter().all(|&b| b == 0xff));
}

#[test]
fn storage_calls_are_ordered() {
    let mut board = FakeBoard::new();
    let data = image(254);

    let mut session = UpdateSession::init(&mut board, 200, &DIGEST, &SIGNATURE).unwrap();
    assert_eq!(session.write(&mut board, &data[..127]).unwrap(), 127);
    assert!(!session.is_complete());
    assert_eq!(session.write(&mut board, &data[127..]).unwrap(), 73);
    assert!(session.is_complete());
    session.finalize(&mut board).unwrap();

    assert_eq!(
        board.storage_calls(),
        vec![
            Call::Delete,
            Call::Store { offset: 0 },
            Call::Store { offset: 0 },
            Call::StoreFinal {
                len: 200,
                digest: DIGEST,
                signature: SIGNATURE,
            },
        ]
    );
    assert_eq!(&board.slot[..200], &data[..200]);
    assert!(board.slot[200..].iter().all(|&b| b == 0xff));
}

#[test]
fn chunks_never_write_past_the_size() {
    let mut board = FakeBoard::new();
    let data = image(127);
    let mut session = UpdateSession::init(&mut board, 300, &DIGEST, &SIGNATURE).unwrap();

    let mut written = Vec::new();
    while !session.is_complete() {
        written.push(session.write(&mut board, &data).unwrap());
        assert!(session.offset() <= session.size());
    }

    assert_eq!(written, vec![127, 127, 46]);
    assert_eq!(session.offset(), 300);
    assert!(board.slot[300..].iter().all(|&b| b == 0xff));
    assert_eq!(&board.slot[254..300], &data[..46]);
}

#[test]
fn write_failure_is_returned_unchanged() {
    let mut board = FakeBoard::new();
    board.fail_store = Some(0);
    let mut session = UpdateSession::init(&mut board, 10, &DIGEST, &SIGNATURE).unwrap();
    assert_eq!(
        session.write(&mut board, &image(10)),
        Err(Error::Write(StorageError(-2)))
    );
}

#[test]
fn erase_failure_is_a_write_error() {
    let mut board = FakeBoard::new();
    board.fail_delete = true;
    assert_eq!(
        UpdateSession::init(&mut board, 10, &DIGEST, &SIGNATURE),
        Err(Error::Write(StorageError(-1)))
    );
}

#[test]
fn finalize_failure_is_fatal() {
    let mut board = FakeBoard::new();
    board.fail_store_final = true;
    let mut session = UpdateSession::init(&mut board, 1, &DIGEST, &SIGNATURE).unwrap();
    session.write(&mut board, &[0]).unwrap();

    let e = session.finalize(&mut board).unwrap_err();
    assert_eq!(e, Error::Fatal(Fatal::Finalize(StorageError(-3))));
    assert!(e.is_fatal());
}

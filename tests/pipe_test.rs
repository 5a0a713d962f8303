/*!
 * Pipe Tests
 * Session pairing, short writes and end-of-stream through the public API
 */

use pretty_assertions::assert_eq;
use syncpipe::{
    CopyFault, CopyIn, CopyOut, PairingPolicy, PipeConfig, PipeError, Role, SessionCoordinator,
    Size, DEFAULT_PIPE_CAPACITY,
};

fn coordinator() -> SessionCoordinator {
    SessionCoordinator::new(PipeConfig::default()).unwrap()
}

/// Caller memory that becomes unreadable after `valid` bytes
struct PartialSource {
    data: Vec<u8>,
    valid: usize,
}

impl CopyIn for PartialSource {
    fn len(&self) -> Size {
        self.data.len()
    }

    fn copy_in(&self, offset: Size, dst: &mut [u8]) -> Result<(), CopyFault> {
        let ok = self.valid.saturating_sub(offset).min(dst.len());
        dst[..ok].copy_from_slice(&self.data[offset..offset + ok]);
        if ok == dst.len() {
            Ok(())
        } else {
            Err(CopyFault { copied: ok })
        }
    }
}

/// Caller memory that becomes unwritable after `valid` bytes
struct PartialSink {
    buf: Vec<u8>,
    valid: usize,
}

impl CopyOut for PartialSink {
    fn capacity(&self) -> Size {
        self.buf.len()
    }

    fn copy_out(&mut self, offset: Size, src: &[u8]) -> Result<(), CopyFault> {
        let ok = self.valid.saturating_sub(offset).min(src.len());
        self.buf[offset..offset + ok].copy_from_slice(&src[..ok]);
        if ok == src.len() {
            Ok(())
        } else {
            Err(CopyFault { copied: ok })
        }
    }
}

#[test]
fn test_default_capacity() {
    let pc = coordinator();
    let writer = pc.open(Role::Writer).unwrap();
    assert_eq!(DEFAULT_PIPE_CAPACITY, 8192);
    assert_eq!(pc.stats(&writer).unwrap().capacity, 8192);
}

#[test]
fn test_write_5000_then_reader_gets_all() {
    let pc = coordinator();
    let writer = pc.open(Role::Writer).unwrap();

    let data: Vec<u8> = (0..5000).map(|i| (i % 251) as u8).collect();
    assert_eq!(pc.write(&writer, &data).unwrap(), 5000);

    let reader = pc.open(Role::Reader).unwrap();
    assert_eq!(reader.session_id(), writer.session_id());

    let read = pc.read(&reader, 8192).unwrap();
    assert_eq!(read.len(), 5000);
    assert_eq!(read, data);
    assert_eq!(pc.stats(&reader).unwrap().buffered, 0);
}

#[test]
fn test_close_before_reader_gives_eof() {
    let pc = coordinator();
    let writer = pc.open(Role::Writer).unwrap();
    pc.close_writer(writer).unwrap();

    let reader = pc.open(Role::Reader).unwrap();
    assert!(pc.read(&reader, 64).unwrap().is_empty());
}

#[test]
fn test_full_buffer_rejects_one_more_byte() {
    let pc = coordinator();
    let writer = pc.open(Role::Writer).unwrap();
    let _reader = pc.open(Role::Reader).unwrap();

    assert_eq!(pc.write(&writer, &vec![7u8; 8192]).unwrap(), 8192);
    assert_eq!(pc.write(&writer, b"x"), Err(PipeError::NoSpace));

    let stats = pc.stats(&writer).unwrap();
    assert_eq!(stats.buffered, 8192);
    assert_eq!(stats.bytes_written, 8192);
}

#[test]
fn test_fifo_across_chunks() {
    let pc = coordinator();
    let writer = pc.open(Role::Writer).unwrap();
    let reader = pc.open(Role::Reader).unwrap();

    pc.write(&writer, b"chunk1").unwrap();
    pc.write(&writer, b"chunk2").unwrap();
    pc.write(&writer, b"chunk3").unwrap();

    assert_eq!(pc.read(&reader, 6).unwrap(), b"chunk1");
    assert_eq!(pc.read(&reader, 6).unwrap(), b"chunk2");
    assert_eq!(pc.read(&reader, 6).unwrap(), b"chunk3");
}

#[test]
fn test_space_returns_after_read() {
    let pc = SessionCoordinator::new(PipeConfig::default().with_capacity(1024)).unwrap();
    let writer = pc.open(Role::Writer).unwrap();
    let reader = pc.open(Role::Reader).unwrap();

    assert_eq!(pc.write(&writer, &vec![0u8; 1024]).unwrap(), 1024);
    assert_eq!(pc.write(&writer, b"x"), Err(PipeError::NoSpace));

    let _ = pc.read(&reader, 100).unwrap();
    assert_eq!(pc.write(&writer, b"success").unwrap(), 7);
    assert_eq!(pc.stats(&reader).unwrap().buffered, 1024 - 100 + 7);
}

#[test]
fn test_occupancy_tracks_written_minus_read() {
    let pc = SessionCoordinator::new(PipeConfig::default().with_capacity(64)).unwrap();
    let writer = pc.open(Role::Writer).unwrap();
    let reader = pc.open(Role::Reader).unwrap();

    let mut written = 0;
    let mut read = 0;
    for round in 0..20 {
        written += pc.write(&writer, &vec![round as u8; 13]).unwrap_or(0);
        read += pc.read(&reader, 7).unwrap().len();

        let stats = pc.stats(&reader).unwrap();
        assert_eq!(stats.buffered, written - read);
        assert!(stats.buffered <= 64);
    }
}

#[test]
fn test_write_fault_commits_prefix() {
    let pc = coordinator();
    let writer = pc.open(Role::Writer).unwrap();
    let reader = pc.open(Role::Reader).unwrap();

    let src = PartialSource {
        data: b"0123456789".to_vec(),
        valid: 4,
    };
    assert_eq!(
        pc.write_from(&writer, &src),
        Err(PipeError::Fault { transferred: 4 })
    );
    assert_eq!(pc.stats(&writer).unwrap().buffered, 4);
    assert_eq!(pc.read(&reader, 64).unwrap(), b"0123");
}

#[test]
fn test_read_fault_consumes_only_delivered() {
    let pc = coordinator();
    let writer = pc.open(Role::Writer).unwrap();
    let reader = pc.open(Role::Reader).unwrap();
    pc.write(&writer, b"abcdefgh").unwrap();

    let mut sink = PartialSink {
        buf: vec![0u8; 16],
        valid: 3,
    };
    assert_eq!(
        pc.read_into(&reader, &mut sink),
        Err(PipeError::Fault { transferred: 3 })
    );
    assert_eq!(&sink.buf[..3], b"abc");

    let stats = pc.stats(&reader).unwrap();
    assert_eq!(stats.buffered, 5);
    assert_eq!(stats.bytes_read, 3);
    assert_eq!(pc.read(&reader, 64).unwrap(), b"defgh");
}

#[test]
fn test_read_into_slice() {
    let pc = coordinator();
    let writer = pc.open(Role::Writer).unwrap();
    let reader = pc.open(Role::Reader).unwrap();
    pc.write(&writer, b"hello").unwrap();

    let mut buf = [0u8; 3];
    assert_eq!(pc.read_into(&reader, &mut buf[..]).unwrap(), 3);
    assert_eq!(&buf, b"hel");
}

#[test]
fn test_any_role_second_writer_joins_and_resets() {
    let pc = coordinator();
    let w1 = pc.open(Role::Writer).unwrap();
    pc.write(&w1, b"discarded").unwrap();

    let w2 = pc.open(Role::Writer).unwrap();
    assert_eq!(w1.session_id(), w2.session_id());
    assert_eq!(pc.stats(&w2).unwrap().buffered, 0);
    assert!(!pc.coordinator_stats().awaiting_partner);
}

#[test]
fn test_match_role_pairs_only_opposites() {
    let pc = SessionCoordinator::new(
        PipeConfig::default().with_pairing(PairingPolicy::MatchRole),
    )
    .unwrap();

    let reader = pc.open(Role::Reader).unwrap();
    assert_eq!(
        pc.open(Role::Reader).unwrap_err(),
        PipeError::RoleInUse(Role::Reader)
    );

    let writer = pc.open(Role::Writer).unwrap();
    assert_eq!(writer.session_id(), reader.session_id());
}

#[test]
fn test_reader_first_then_writer_pairs() {
    let pc = coordinator();
    let reader = pc.open_reader().unwrap();
    let stats = pc.stats(&reader).unwrap();
    assert!(stats.reader_present);
    assert!(!stats.writer_present);
    assert!(stats.awaiting_partner);

    let writer = pc.open_writer().unwrap();
    let stats = pc.stats(&writer).unwrap();
    assert!(stats.reader_present && stats.writer_present);
    assert!(!stats.awaiting_partner);
}

#[test]
fn test_error_errno_mapping() {
    use nix::errno::Errno;

    assert_eq!(PipeError::NoSpace.errno(), Errno::ENOSPC);
    assert_eq!(PipeError::Interrupted.errno(), Errno::EINTR);
    assert_eq!(PipeError::Fault { transferred: 1 }.errno(), Errno::EFAULT);
    assert_eq!(
        PipeError::AllocationFailed("oom".into()).errno(),
        Errno::ENOMEM
    );
}

#[test]
fn test_stats_serialize_skips_defaults() {
    let pc = coordinator();
    let writer = pc.open(Role::Writer).unwrap();
    let json = serde_json::to_value(pc.stats(&writer).unwrap()).unwrap();

    assert_eq!(json["capacity"], 8192);
    assert!(json.get("buffered").is_none());
    assert!(json.get("writer_closed").is_none());
    assert_eq!(json["awaiting_partner"], true);
}

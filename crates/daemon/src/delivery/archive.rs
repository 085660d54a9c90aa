//! Streaming tar.gz archives of directory trees.
//!
//! The archive is produced on a blocking worker that writes into a bounded
//! channel. The response body drains the channel, so at most a few chunks are
//! in memory and a slow client applies backpressure to the archiver. If the
//! body is dropped, the next channel send fails and the worker stops.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};
use flate2::write::GzEncoder;
use flate2::Compression;
use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;

use super::ByteStream;

/// Size of the chunks handed to the response body.
pub const ARCHIVE_CHUNK_SIZE: usize = 64 * 1024;

/// Number of chunks that may wait in the channel.
const ARCHIVE_CHANNEL_DEPTH: usize = 8;

/// File extension of the produced archives.
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// Walks `dir` without following symlinks and returns the number of entries.
///
/// Run before streaming starts, so unreadable trees fail the request with a
/// proper status instead of truncating an already-started body.
pub fn scan_tree(dir: &Path) -> io::Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        count += 1;
        if entry.file_type()?.is_dir() {
            count += scan_tree(&entry.path())?;
        }
    }
    Ok(count)
}

/// Streams `source` as a gzip-compressed tar archive.
///
/// Entries are stored under `root_name`; an empty name puts the directory's
/// contents at the archive root.
pub fn archive_stream(source: PathBuf, root_name: String) -> ByteStream {
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(ARCHIVE_CHANNEL_DEPTH);

    tokio::task::spawn_blocking(move || {
        let writer = ChannelWriter::new(tx.clone());
        match write_tar_gz(&source, &root_name, writer) {
            Ok(()) => tracing::debug!("Finished archive of {:?}", source),
            Err(_) if tx.is_closed() => {
                tracing::debug!("Archive of {:?} abandoned by receiver", source);
            }
            Err(e) => {
                tracing::error!("Archiving {:?} failed: {}", source, e);
                let _ = tx.blocking_send(Err(e));
            }
        }
    });

    stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    })
    .boxed()
}

/// Writes a tar.gz of `source` into `writer`.
pub fn write_tar_gz<W: Write>(source: &Path, root_name: &str, writer: W) -> io::Result<()> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);
    builder.append_dir_all(root_name, source)?;

    let encoder = builder.into_inner()?;
    let mut writer = encoder.finish()?;
    writer.flush()
}

/// `Write` adapter that forwards fixed-size chunks into a channel.
struct ChannelWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
    buf: BytesMut,
}

impl ChannelWriter {
    fn new(tx: mpsc::Sender<io::Result<Bytes>>) -> Self {
        Self {
            tx,
            buf: BytesMut::with_capacity(ARCHIVE_CHUNK_SIZE),
        }
    }

    fn send_buffered(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = self.buf.split().freeze();
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "archive receiver dropped"))
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        if self.buf.len() >= ARCHIVE_CHUNK_SIZE {
            self.send_buffered()?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffered()
    }
}

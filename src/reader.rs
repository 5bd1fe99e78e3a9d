use std::{
    io,
    path::{Path, PathBuf},
};

use bytes::{Bytes, BytesMut};
use tokio::{fs::File, sync::mpsc};
use tokio_stream::StreamExt;
use tokio_util::codec::{Decoder, FramedRead};
use tracing::{debug, info};

use crate::{
    config::{Config, InputFormat},
    error::{Error, Result},
    parser::{parse_chunk, parse_document},
    registry::Registry,
};

// Tokio MAX_BUF for blocking IO: https://github.com/tokio-rs/tokio/blob/master/tokio/src/io/blocking.rs#L26
static BUFFER_SIZE: usize = 2 * 1024 * 1024;

/// A run of complete lines and the 1-based number of its first line.
#[derive(Debug)]
struct Chunk {
    first_line: usize,
    data: Bytes,
}

/// Splits a byte stream at the last newline of whatever has been buffered,
/// so every chunk holds whole lines only.
#[derive(Debug, Default)]
struct ChunkDecoder {
    lines: usize,
}

impl ChunkDecoder {
    fn take(&mut self, data: BytesMut) -> Chunk {
        let first_line = self.lines + 1;
        self.lines += memchr::memchr_iter(b'\n', &data).count();
        Chunk {
            first_line,
            data: data.freeze(),
        }
    }
}

impl Decoder for ChunkDecoder {
    type Item = Chunk;
    type Error = io::Error;

    #[inline]
    fn decode(&mut self, src: &mut BytesMut) -> std::result::Result<Option<Self::Item>, Self::Error> {
        match memchr::memrchr(b'\n', src) {
            Some(index) => Ok(Some(self.take(src.split_to(index + 1)))),
            None => Ok(None),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> std::result::Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(chunk) => Ok(Some(chunk)),
            None if src.is_empty() => Ok(None),
            // last line without a trailing newline
            None => Ok(Some(self.take(src.split()))),
        }
    }
}

fn io_error(path: &Path, source: io::Error) -> Error {
    match source.kind() {
        io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
        _ => Error::Io {
            path: path.to_path_buf(),
            source,
        },
    }
}

/// Reads every reading from the configured input into a registry.
#[tokio::main]
pub async fn load(config: &Config) -> Result<Registry> {
    info!(input = %config.input.display(), format = ?config.format, "loading readings");
    let registry = match config.format {
        InputFormat::Json => load_document(&config.input).await?,
        InputFormat::JsonLines => load_lines(&config.input, BUFFER_SIZE).await?,
    };
    info!(
        sensors = registry.len(),
        readings = registry.readings(),
        "loaded readings"
    );
    Ok(registry)
}

async fn load_document(path: &Path) -> Result<Registry> {
    let input = tokio::fs::read(path)
        .await
        .map_err(|source| io_error(path, source))?;
    let readings = parse_document(&input)?;
    Ok(readings.into_iter().collect())
}

/// Streams a JSON Lines file, parsing chunks on blocking threads and merging
/// the partial registries as they complete.
async fn load_lines(path: &Path, capacity: usize) -> Result<Registry> {
    let file = File::open(path)
        .await
        .map_err(|source| io_error(path, source))?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Result<Registry>>();
    let path_buf: PathBuf = path.to_path_buf();
    let reader = tokio::spawn(async move {
        let mut framed = FramedRead::with_capacity(file, ChunkDecoder::default(), capacity);
        while let Some(chunk) = framed.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(source) => {
                    let _ = tx.send(Err(io_error(&path_buf, source)));
                    return;
                }
            };
            debug!(first_line = chunk.first_line, bytes = chunk.data.len(), "parsing chunk");
            let tx = tx.clone();
            tokio::task::spawn_blocking(move || {
                let _ = tx.send(parse_chunk(&chunk.data, chunk.first_line));
            });
        }
    });

    // Once a chunk fails, chunks already in flight are still drained so the
    // error reported is the one closest to the start of the file.
    let mut results = Registry::new();
    let mut failure: Option<Error> = None;
    while let Some(partial) = rx.recv().await {
        match partial {
            Ok(partial) if failure.is_none() => results.merge(partial),
            Ok(_) => {}
            Err(error) => {
                reader.abort();
                failure = Some(match failure.take() {
                    Some(first) if first.position() <= error.position() => first,
                    _ => error,
                });
            }
        }
    }
    match failure {
        Some(error) => Err(error),
        None => Ok(results),
    }
}

use crate::core::{Record, RecordSink};
use crate::utils::error::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Newline-delimited record writer over any `Write`.
#[derive(Debug)]
pub struct LineSink<W: Write> {
    writer: Option<W>,
}

impl<W: Write> LineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
        }
    }

    /// Hands back the writer; `None` if a wrapper already took it.
    pub fn into_inner(mut self) -> Option<W> {
        self.writer.take()
    }

    fn writer(&mut self) -> io::Result<&mut W> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "sink already closed"))
    }
}

impl<W: Write + Send> RecordSink for LineSink<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        let writer = self.writer()?;
        writer.write_all(record.as_str().as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Where records end up: standard output or a gzip file.
pub enum OutputSink {
    Stdout(LineSink<io::Stdout>),
    Gzip {
        path: PathBuf,
        sink: LineSink<GzEncoder<BufWriter<File>>>,
    },
}

impl OutputSink {
    pub fn stdout() -> Self {
        Self::Stdout(LineSink::new(io::stdout()))
    }

    pub fn gzip<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        tracing::info!("Writing gzipped output to {}", path.display());
        Ok(Self::Gzip {
            path,
            sink: LineSink::new(encoder),
        })
    }

    /// `None` 代表輸出到 stdout
    pub fn from_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::gzip(path),
            None => Ok(Self::stdout()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Stdout(_) => "stdout".to_string(),
            Self::Gzip { path, .. } => path.display().to_string(),
        }
    }
}

impl RecordSink for OutputSink {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        match self {
            Self::Stdout(sink) => sink.write_record(record),
            Self::Gzip { sink, .. } => sink.write_record(record),
        }
    }

    fn close(&mut self) -> Result<()> {
        match self {
            Self::Stdout(sink) => sink.close(),
            Self::Gzip { path, sink } => {
                // gzip 需要 finish() 才會寫入結尾
                let Some(encoder) = sink.writer.take() else {
                    return Ok(());
                };
                tracing::info!("Closing {}", path.display());
                let mut inner = encoder.finish()?;
                inner.flush()?;
                Ok(())
            }
        }
    }
}

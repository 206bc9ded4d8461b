use crate::core::{Delivery, Record, RecordSource};
use crate::utils::error::{Result, StreamError};
use async_trait::async_trait;
use reqwest::Response;
use serde_json::Value;

/// Longest line accepted without a newline before the stream is treated as broken.
pub const DEFAULT_MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Bytes received so far, split on `\n`.
#[derive(Debug)]
pub struct LineBuffer {
    bytes: Vec<u8>,
    max_line_bytes: usize,
}

impl LineBuffer {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            bytes: Vec::new(),
            max_line_bytes,
        }
    }

    /// 超過上限仍沒有換行時視為串流錯誤
    pub fn push(&mut self, chunk: &[u8]) -> Result<()> {
        self.bytes.extend_from_slice(chunk);
        if self.bytes.len() > self.max_line_bytes && !self.bytes.contains(&b'\n') {
            return Err(StreamError::SourceError {
                message: format!(
                    "stream line exceeded {} bytes without a newline",
                    self.max_line_bytes
                ),
            });
        }
        Ok(())
    }

    pub fn take_line(&mut self) -> Option<Vec<u8>> {
        let newline_pos = self.bytes.iter().position(|&b| b == b'\n')?;
        Some(self.bytes.drain(..=newline_pos).collect())
    }

    /// Whatever is left after the last newline.
    pub fn take_rest(&mut self) -> Option<Vec<u8>> {
        if self.bytes.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.bytes))
        }
    }
}

/// Newline-delimited JSON body of a streaming endpoint.
pub struct TweetStream {
    response: Response,
    buffer: LineBuffer,
    finished: bool,
}

impl TweetStream {
    pub fn new(response: Response) -> Self {
        Self {
            response,
            buffer: LineBuffer::new(DEFAULT_MAX_LINE_BYTES),
            finished: false,
        }
    }
}

#[async_trait]
impl RecordSource for TweetStream {
    async fn next_delivery(&mut self) -> Result<Option<Delivery>> {
        loop {
            while let Some(line) = self.buffer.take_line() {
                if let Some(delivery) = decode_line(&line)? {
                    return Ok(Some(delivery));
                }
            }

            if self.finished {
                return Ok(None);
            }

            match self.response.chunk().await? {
                Some(chunk) => self.buffer.push(&chunk)?,
                None => {
                    self.finished = true;
                    // 連線結束時最後一行可能沒有換行
                    if let Some(rest) = self.buffer.take_rest() {
                        if let Some(delivery) = decode_line(&rest)? {
                            return Ok(Some(delivery));
                        }
                    }
                }
            }
        }
    }
}

/// Classifies one line of the stream body. Keep-alive blank lines yield `None`.
pub fn decode_line(line: &[u8]) -> Result<Option<Delivery>> {
    let text = std::str::from_utf8(line)
        .map_err(|e| StreamError::SourceError {
            message: format!("stream line is not valid UTF-8: {}", e),
        })?
        .trim();

    if text.is_empty() {
        tracing::debug!("Received keep-alive");
        return Ok(None);
    }

    let payload: Value = serde_json::from_str(text)?;
    let delivery = match &payload {
        Value::Null => Delivery::NullPayload,
        Value::Object(fields) => {
            if fields.get("data").is_some_and(|data| !data.is_null()) {
                Delivery::Record(Record::new(text))
            } else if fields.contains_key("errors") || fields.contains_key("title") {
                return Err(StreamError::SourceError {
                    message: error_message(&payload),
                });
            } else {
                Delivery::NullPayload
            }
        }
        other => {
            return Err(StreamError::SourceError {
                message: format!("unexpected stream payload: {}", other),
            })
        }
    };

    Ok(Some(delivery))
}

fn error_message(payload: &Value) -> String {
    payload
        .get("detail")
        .or_else(|| payload.get("title"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            payload
                .get("errors")
                .and_then(|errors| errors.get(0))
                .and_then(|first| first.get("detail").or_else(|| first.get("title")))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| payload.to_string())
}

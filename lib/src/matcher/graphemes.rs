use bstr::ByteSlice;

use crate::matcher::StreamError;

/// Buffers raw input chunks and releases whole grapheme clusters.
///
/// Input arrives in arbitrary chunks, so a chunk boundary can fall in the
/// middle of a UTF-8 sequence or in the middle of a multi-codepoint
/// grapheme cluster (emoji with modifiers, combining sequences). This stage
/// holds back the undecodable byte tail and the final cluster of the
/// decoded text, because both may still grow when the next chunk arrives.
/// Whatever it releases is final: re-chunking the same input can never
/// change the cluster sequence seen downstream.
pub(crate) struct GraphemeBuffer {
    /// Bytes that don't yet form a complete UTF-8 sequence.
    pending: Vec<u8>,
    /// Decoded text that has not been released yet.
    text: String,
    /// Number of input bytes decoded so far, for error offsets.
    consumed: usize,
}

impl GraphemeBuffer {
    pub fn new() -> Self {
        Self { pending: Vec::new(), text: String::new(), consumed: 0 }
    }

    /// Appends a chunk of raw bytes.
    ///
    /// Fails with [`StreamError::InvalidUtf8`] if the accumulated bytes
    /// contain an invalid sequence. An incomplete sequence at the end of
    /// the chunk is not an error; it is kept until more bytes arrive.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), StreamError> {
        self.pending.extend_from_slice(chunk);

        let (valid, complete) = match std::str::from_utf8(&self.pending) {
            Ok(_) => (self.pending.len(), true),
            Err(err) => {
                if err.error_len().is_some() {
                    return Err(StreamError::InvalidUtf8 {
                        offset: self.consumed + err.valid_up_to(),
                    });
                }
                (err.valid_up_to(), false)
            }
        };

        // The range was just validated above.
        self.text.push_str(
            std::str::from_utf8(&self.pending[..valid]).unwrap(),
        );
        self.consumed += valid;

        if complete {
            self.pending.clear();
        } else {
            self.pending.drain(..valid);
        }

        Ok(())
    }

    /// Releases the text whose grapheme segmentation can no longer change.
    ///
    /// This is everything up to, but not including, the final cluster: the
    /// next chunk could extend that cluster (a combining mark, a ZWJ
    /// continuation), so it stays buffered until more text follows it or
    /// the stream ends.
    pub fn take_ready(&mut self) -> String {
        let last_cluster_start = self
            .text
            .as_bytes()
            .grapheme_indices()
            .last()
            .map(|(start, _, _)| start);
        match last_cluster_start {
            Some(start) if start > 0 => {
                let tail = self.text.split_off(start);
                std::mem::replace(&mut self.text, tail)
            }
            _ => String::new(),
        }
    }

    /// Signals end of input and releases everything still buffered.
    ///
    /// Fails with [`StreamError::InvalidUtf8`] if the stream ended in the
    /// middle of a UTF-8 sequence.
    pub fn finish(&mut self) -> Result<String, StreamError> {
        if !self.pending.is_empty() {
            return Err(StreamError::InvalidUtf8 { offset: self.consumed });
        }
        Ok(std::mem::take(&mut self.text))
    }
}

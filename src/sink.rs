//! Output side: completed text lines end up here

use colored::Colorize;

use crate::decoder::Emission;
use crate::registry::SourceId;

/// Receives every completed line the decoders produce.
pub trait LogSink {
    fn emit(&mut self, source: SourceId, emission: Emission);
}

/// Prints decoded text to stdout, one line per emission: plain text for a
/// clean message, a marker suffix for truncated and aborted ones.
pub struct ConsoleSink {
    tag_sources: bool,
}

impl ConsoleSink {
    /// `tag_sources` prefixes each line with its source id; off by default,
    /// all sources then interleave into one untagged stream.
    pub fn new(tag_sources: bool) -> Self {
        Self { tag_sources }
    }

    fn prefix(&self, source: SourceId) -> String {
        if self.tag_sources {
            format!("{} ", format!("[{}]", source).dimmed())
        } else {
            String::new()
        }
    }
}

impl LogSink for ConsoleSink {
    fn emit(&mut self, source: SourceId, emission: Emission) {
        let prefix = self.prefix(source);
        match emission {
            Emission::Line(text) => println!("{}{}", prefix, text),
            Emission::LineTruncated(text) => {
                println!("{}{} {}", prefix, text, "[...]".dimmed())
            }
            Emission::LineAborted(text) => {
                println!("{}{} {}", prefix, text, "[aborted]".yellow())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_disabled_by_default_flag() {
        let sink = ConsoleSink::new(false);
        assert!(sink.prefix(3).is_empty());
    }

    #[test]
    fn test_prefix_carries_source_id() {
        let sink = ConsoleSink::new(true);
        assert!(sink.prefix(3).contains("[3]"));
    }

    #[test]
    fn test_emit_does_not_panic() {
        let mut sink = ConsoleSink::new(true);
        sink.emit(1, Emission::Line("hello".to_string()));
        sink.emit(1, Emission::LineTruncated("long".to_string()));
        sink.emit(1, Emission::LineAborted("cut".to_string()));
    }
}

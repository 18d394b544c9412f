//! Per-source decoder registry
//!
//! Routes each incoming `(source, bytes)` packet to the decoder owned by that
//! source, so interleaved streams from independent MIDI inputs never corrupt
//! each other's parse state.

use std::collections::HashMap;

use tracing::trace;

use crate::decoder::{Decoder, DecoderConfig};
use crate::sink::LogSink;

/// Stable identity of one MIDI input source, assigned by the endpoint
/// provider. Zero is never a valid id.
pub type SourceId = u64;

pub struct Registry<S: LogSink> {
    config: DecoderConfig,
    decoders: HashMap<SourceId, Decoder>,
    sink: S,
}

impl<S: LogSink> Registry<S> {
    pub fn new(config: DecoderConfig, sink: S) -> Self {
        Self {
            config,
            decoders: HashMap::new(),
            sink,
        }
    }

    /// Start decoding a newly connected source. No-op if the source is
    /// already known, so a duplicate add never resets an in-progress message.
    pub fn on_source_added(&mut self, id: SourceId) {
        self.decoders
            .entry(id)
            .or_insert_with(|| Decoder::new(self.config));
    }

    /// Forget a disconnected source. Any unterminated buffered text is
    /// discarded, not flushed.
    pub fn on_source_removed(&mut self, id: SourceId) {
        self.decoders.remove(&id);
    }

    /// Feed a packet of raw bytes from one source through its decoder and
    /// forward every completed line to the sink. Bytes for an unknown id are
    /// dropped: packets can race a disconnect.
    pub fn dispatch(&mut self, id: SourceId, bytes: &[u8]) {
        let Some(decoder) = self.decoders.get_mut(&id) else {
            trace!("dropping {} bytes for unknown source {}", bytes.len(), id);
            return;
        };
        for &byte in bytes {
            if let Some(emission) = decoder.process(byte) {
                self.sink.emit(id, emission);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Emission;

    #[derive(Default)]
    struct MemorySink {
        emissions: Vec<(SourceId, Emission)>,
    }

    impl LogSink for MemorySink {
        fn emit(&mut self, source: SourceId, emission: Emission) {
            self.emissions.push((source, emission));
        }
    }

    fn registry() -> Registry<MemorySink> {
        Registry::new(DecoderConfig::default(), MemorySink::default())
    }

    #[test]
    fn test_sources_decode_independently() {
        let mut r = registry();
        r.on_source_added(1);
        r.on_source_added(2);

        // interleave the two streams byte by byte
        let a = [0xF0, 0x70, b'a'];
        let b = [0xF0, 0x70, b'b'];
        for i in 0..3 {
            r.dispatch(1, &a[i..=i]);
            r.dispatch(2, &b[i..=i]);
        }
        r.dispatch(2, &[0xF7]);
        r.dispatch(1, &[0xF7]);

        assert_eq!(
            r.sink.emissions,
            vec![
                (2, Emission::Line("b".to_string())),
                (1, Emission::Line("a".to_string())),
            ]
        );
    }

    #[test]
    fn test_dispatch_unknown_source_is_noop() {
        let mut r = registry();
        r.dispatch(7, &[0xF0, 0x70, b'x', 0xF7]);
        assert!(r.sink.emissions.is_empty());
        assert!(r.decoders.is_empty());
    }

    #[test]
    fn test_duplicate_add_keeps_decoder_state() {
        let mut r = registry();
        r.on_source_added(1);
        r.dispatch(1, &[0xF0, 0x70, b'h', b'i']);
        r.on_source_added(1);
        r.dispatch(1, &[0xF7]);
        assert_eq!(r.sink.emissions, vec![(1, Emission::Line("hi".to_string()))]);
    }

    #[test]
    fn test_remove_discards_buffered_text() {
        let mut r = registry();
        r.on_source_added(1);
        r.dispatch(1, &[0xF0, 0x70, b'h', b'i']);
        r.on_source_removed(1);
        assert!(r.sink.emissions.is_empty());
        // bytes arriving after removal are dropped
        r.dispatch(1, &[0xF7]);
        assert!(r.sink.emissions.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut r = registry();
        r.on_source_removed(42);
        assert!(r.decoders.is_empty());
    }

    #[test]
    fn test_config_reaches_decoders() {
        let mut r = Registry::new(
            DecoderConfig {
                vendor_id: 0x42,
                ..Default::default()
            },
            MemorySink::default(),
        );
        r.on_source_added(1);
        r.dispatch(1, &[0xF0, 0x42, b'y', 0xF7]);
        assert_eq!(r.sink.emissions, vec![(1, Emission::Line("y".to_string()))]);
    }
}

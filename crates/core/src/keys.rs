//! Bucket key encoding.
//!
//! A bucket key has the shape
//! `[prefix SEP] name SEP id SEP state SEP <state> [SEP postfix]`.
//! The segment count and the positions of the id and state segments depend
//! only on whether a prefix and a postfix are configured, so they are derived
//! once into a [`KeyLayout`] that both [`KeyCodec::format`] and
//! [`KeyCodec::parse`] read from.

use crate::chain::StateChain;
use crate::error::{PipeError, PipeResult};
use rpipe_protocol::config_models::PipelineConfig;

/// Literal segment placed in front of the state name.
pub const STATE_MARKER: &str = "state";

/// Segment positions of a bucket key for one prefix/postfix combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyLayout {
    pub segment_count: usize,
    pub name_index: usize,
    pub id_index: usize,
    pub marker_index: usize,
    pub state_index: usize,
    pub has_prefix: bool,
    pub has_postfix: bool,
}

impl KeyLayout {
    /// Compute the layout for the given optional segments.
    pub const fn derive(has_prefix: bool, has_postfix: bool) -> Self {
        let name_index = has_prefix as usize;
        let id_index = name_index + 1;
        let marker_index = id_index + 1;
        let state_index = marker_index + 1;
        Self {
            segment_count: state_index + 1 + has_postfix as usize,
            name_index,
            id_index,
            marker_index,
            state_index,
            has_prefix,
            has_postfix,
        }
    }
}

/// The `(id, state)` pair encoded in a bucket key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    pub id: String,
    pub state: String,
}

/// Builds and parses bucket keys for one pipeline configuration.
#[derive(Debug, Clone)]
pub struct KeyCodec {
    layout: KeyLayout,
    separator: char,
    name: String,
    prefix: Option<String>,
    postfix: Option<String>,
    chain: StateChain,
}

impl KeyCodec {
    /// Create a codec and its state chain from a pipeline configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the chain is invalid, if the separator
    /// occurs in the fixed `state` segment, or if the name, the prefix, the
    /// postfix or a state is empty or contains the separator.
    pub fn new(config: &PipelineConfig) -> PipeResult<Self> {
        let chain = StateChain::new(&config.collector_name, &config.states)?;
        let separator = config.separator;

        if STATE_MARKER.contains(separator) {
            return Err(PipeError::InvalidConfig(format!(
                "separator '{separator}' occurs in the '{STATE_MARKER}' key segment"
            )));
        }
        check_segment("name", &config.name, separator)?;
        if let Some(prefix) = &config.prefix {
            check_segment("prefix", prefix, separator)?;
        }
        if let Some(postfix) = &config.postfix {
            check_segment("postfix", postfix, separator)?;
        }
        for state in chain.states() {
            check_segment("state", state, separator)?;
        }

        Ok(Self {
            layout: KeyLayout::derive(config.prefix.is_some(), config.postfix.is_some()),
            separator,
            name: config.name.clone(),
            prefix: config.prefix.clone(),
            postfix: config.postfix.clone(),
            chain,
        })
    }

    pub fn layout(&self) -> KeyLayout {
        self.layout
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn chain(&self) -> &StateChain {
        &self.chain
    }

    pub fn is_valid_state(&self, state: &str) -> bool {
        self.chain.contains(state)
    }

    /// Build the key for `(id, state)`.
    ///
    /// Pure and unchecked: callers validate the state and identifier first.
    pub fn format(&self, id: &str, state: &str) -> String {
        let mut segments: Vec<&str> = Vec::with_capacity(self.layout.segment_count);
        if let Some(prefix) = &self.prefix {
            segments.push(prefix);
        }
        segments.push(&self.name);
        segments.push(id);
        segments.push(STATE_MARKER);
        segments.push(state);
        if let Some(postfix) = &self.postfix {
            segments.push(postfix);
        }
        debug_assert_eq!(segments.len(), self.layout.segment_count);

        let mut buf = [0u8; 4];
        let sep: &str = self.separator.encode_utf8(&mut buf);
        segments.join(sep)
    }

    /// Build the key for `(id, state)` after checking both.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateName` for a state outside the chain and
    /// `InvalidIdentifier` for an empty id or one containing the separator.
    pub fn checked_format(&self, id: &str, state: &str) -> PipeResult<String> {
        if !self.is_valid_state(state) {
            return Err(PipeError::InvalidStateName(state.to_string()));
        }
        self.check_id(id)?;
        Ok(self.format(id, state))
    }

    /// Reject identifiers that would produce a key `parse` cannot split back.
    pub fn check_id(&self, id: &str) -> PipeResult<()> {
        if id.is_empty() || id.contains(self.separator) {
            Err(PipeError::InvalidIdentifier(id.to_string()))
        } else {
            Ok(())
        }
    }

    /// Split a key back into its `(id, state)` pair.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyFormat` if the segment count differs from the
    /// layout, a fixed segment does not match this configuration, the
    /// identifier is empty, or the state is not in the chain.
    pub fn parse(&self, key: &str) -> PipeResult<ParsedKey> {
        let parts: Vec<&str> = key.split(self.separator).collect();
        let layout = self.layout;

        if parts.len() != layout.segment_count {
            return Err(invalid_key(
                key,
                format!(
                    "expected {} segments, found {}",
                    layout.segment_count,
                    parts.len()
                ),
            ));
        }

        if let Some(prefix) = &self.prefix {
            expect_segment(key, "prefix", parts[0], prefix)?;
        }
        expect_segment(key, "name", parts[layout.name_index], &self.name)?;
        expect_segment(key, "marker", parts[layout.marker_index], STATE_MARKER)?;
        if let Some(postfix) = &self.postfix {
            expect_segment(key, "postfix", parts[layout.segment_count - 1], postfix)?;
        }

        let id = parts[layout.id_index];
        if id.is_empty() {
            return Err(invalid_key(key, "empty identifier".to_string()));
        }

        let state = parts[layout.state_index];
        if !self.chain.contains(state) {
            return Err(invalid_key(key, format!("unknown state '{state}'")));
        }

        Ok(ParsedKey {
            id: id.to_string(),
            state: state.to_string(),
        })
    }
}

fn check_segment(what: &str, value: &str, separator: char) -> PipeResult<()> {
    if value.is_empty() {
        return Err(PipeError::InvalidConfig(format!("{what} must not be empty")));
    }
    if value.contains(separator) {
        return Err(PipeError::InvalidConfig(format!(
            "{what} '{value}' contains the separator '{separator}'"
        )));
    }
    Ok(())
}

fn expect_segment(key: &str, what: &str, found: &str, expected: &str) -> PipeResult<()> {
    if found == expected {
        Ok(())
    } else {
        Err(invalid_key(
            key,
            format!("{what} segment is '{found}', expected '{expected}'"),
        ))
    }
}

fn invalid_key(key: &str, reason: String) -> PipeError {
    PipeError::InvalidKeyFormat {
        key: key.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig::new("g").with_states(["processing", "done", "failed"])
    }

    #[test]
    fn test_layout_without_optional_segments() {
        let layout = KeyLayout::derive(false, false);
        assert_eq!(layout.segment_count, 4);
        assert_eq!(layout.id_index, 1);
        assert_eq!(layout.state_index, 3);
    }

    #[test]
    fn test_layout_with_prefix_and_postfix() {
        let layout = KeyLayout::derive(true, true);
        assert_eq!(layout.segment_count, 6);
        assert_eq!(layout.name_index, 1);
        assert_eq!(layout.id_index, 2);
        assert_eq!(layout.state_index, 4);
    }

    #[test]
    fn test_postfix_only_shifts_count_not_positions() {
        let plain = KeyLayout::derive(false, false);
        let layout = KeyLayout::derive(false, true);
        assert_eq!(layout.segment_count, plain.segment_count + 1);
        assert_eq!(layout.id_index, plain.id_index);
        assert_eq!(layout.state_index, plain.state_index);
    }

    #[test]
    fn test_format_concrete_scenario() {
        let codec = KeyCodec::new(&config().with_prefix("p").with_postfix("q")).unwrap();
        assert_eq!(
            codec.format("123", "processing"),
            "p:g:123:state:processing:q"
        );
    }

    #[test]
    fn test_format_shapes() {
        let plain = KeyCodec::new(&config()).unwrap();
        assert_eq!(plain.format("1", "done"), "g:1:state:done");

        let prefixed = KeyCodec::new(&config().with_prefix("pipe")).unwrap();
        assert_eq!(prefixed.format("1", "done"), "pipe:g:1:state:done");

        let postfixed = KeyCodec::new(&config().with_postfix("v1")).unwrap();
        assert_eq!(postfixed.format("1", "done"), "g:1:state:done:v1");
    }

    #[test]
    fn test_custom_separator() {
        let codec = KeyCodec::new(&config().with_prefix("p").with_separator('|')).unwrap();
        let key = codec.format("a:b", "done");
        assert_eq!(key, "p|g|a:b|state|done");
        let parsed = codec.parse(&key).unwrap();
        assert_eq!(parsed.id, "a:b");
    }

    #[test]
    fn test_parse() {
        let codec = KeyCodec::new(&config().with_prefix("p").with_postfix("q")).unwrap();
        let parsed = codec.parse("p:g:123:state:processing:q").unwrap();
        assert_eq!(
            parsed,
            ParsedKey {
                id: "123".to_string(),
                state: "processing".to_string()
            }
        );
    }

    #[test]
    fn test_parse_wrong_segment_count() {
        let codec = KeyCodec::new(&config()).unwrap();
        let result = codec.parse("invalidKeyFormat");
        assert!(matches!(result, Err(PipeError::InvalidKeyFormat { .. })));
    }

    #[test]
    fn test_parse_rejects_key_from_other_configuration() {
        let with_prefix = KeyCodec::new(&config().with_prefix("p")).unwrap();
        let with_postfix = KeyCodec::new(&config().with_postfix("q")).unwrap();

        // Same segment count, different shape.
        let key = with_prefix.format("123", "done");
        assert!(matches!(
            with_postfix.parse(&key),
            Err(PipeError::InvalidKeyFormat { .. })
        ));

        let other_name = KeyCodec::new(&PipelineConfig::new("h").with_states(["done"])).unwrap();
        assert!(KeyCodec::new(&config())
            .unwrap()
            .parse(&other_name.format("1", "done"))
            .is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_state() {
        let codec = KeyCodec::new(&config()).unwrap();
        assert!(codec.parse("g:1:state:archived").is_err());
    }

    #[test]
    fn test_is_valid_state() {
        let codec = KeyCodec::new(&config()).unwrap();
        assert!(codec.is_valid_state("collector"));
        assert!(codec.is_valid_state("failed"));
        assert!(!codec.is_valid_state("invalidState"));
    }

    #[test]
    fn test_checked_format() {
        let codec = KeyCodec::new(&config()).unwrap();
        assert_eq!(codec.checked_format("7", "done").unwrap(), "g:7:state:done");
        assert!(matches!(
            codec.checked_format("7", "archived"),
            Err(PipeError::InvalidStateName(_))
        ));
        assert!(matches!(
            codec.checked_format("7:8", "done"),
            Err(PipeError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            codec.checked_format("", "done"),
            Err(PipeError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_rejects_separator_inside_state_marker() {
        for separator in ['s', 't', 'a', 'e'] {
            let config = PipelineConfig::new("g")
                .with_collector_name("inbox")
                .with_states(["done"])
                .with_separator(separator);
            assert!(matches!(
                KeyCodec::new(&config),
                Err(PipeError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_rejects_separator_in_config() {
        assert!(KeyCodec::new(&PipelineConfig::new("a:b")).is_err());
        assert!(KeyCodec::new(&config().with_prefix("x:y")).is_err());
        assert!(KeyCodec::new(&config().with_postfix("")).is_err());
        assert!(KeyCodec::new(&PipelineConfig::new("g").with_states(["to:do"])).is_err());
    }
}

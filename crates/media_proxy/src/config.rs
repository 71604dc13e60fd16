use crate::media_info::ParseFlags;

pub const DEFAULT_AUDIO_OUTPUT: &str = "default";

/// How an [crate::Engine] sets up the objects created through it.
///
/// Fields left unset on the builder take their values from [EngineConfig::default].
#[derive(Clone, Debug, derive_builder::Builder)]
#[builder(pattern = "owned", default)]
pub struct EngineConfig {
    /// The audio output module players use, and go back to after being stopped.
    #[builder(setter(into))]
    pub audio_output: String,

    /// Hardware decoder modules to try, in order, when hardware decoding is enabled on a media.
    ///
    /// Software decoding is always the last resort and need not be listed.
    #[builder(setter(custom))]
    pub hw_decoders: Vec<String>,

    /// Whether the decoders above are known to work on this device.
    ///
    /// If not, hardware decoding is only used when a caller forces it.
    pub hw_decoders_known: bool,

    /// Flags used by [crate::Media::parse_with_defaults].
    pub default_parse_flags: ParseFlags,

    /// Whether handing a media to a player also applies the default decoder options to it, unless the application set
    /// codec options of its own.
    pub apply_default_media_options: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            audio_output: DEFAULT_AUDIO_OUTPUT.to_string(),
            hw_decoders: vec![],
            hw_decoders_known: true,
            default_parse_flags: ParseFlags::FETCH_LOCAL,
            apply_default_media_options: true,
        }
    }
}

impl EngineConfigBuilder {
    pub fn add_hw_decoder(mut self, module: impl Into<String>) -> Self {
        self.hw_decoders
            .get_or_insert_with(Vec::new)
            .push(module.into());
        self
    }
}

impl EngineConfig {
    /// The decoder option for a media, given whether hardware decoding was asked for and whether it is being forced.
    pub(crate) fn codec_options(&self, enabled: bool, force: bool) -> Vec<String> {
        let usable = enabled && !self.hw_decoders.is_empty() && (self.hw_decoders_known || force);
        if !usable {
            return vec![":codec=all".to_string()];
        }

        let mut codecs = self.hw_decoders.join(",");
        codecs.push_str(",all");
        vec![
            ":file-caching=1500".to_string(),
            ":network-caching=1500".to_string(),
            format!(":codec={}", codecs),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_fields_take_defaults() {
        let config = EngineConfigBuilder::default()
            .audio_output("opensles")
            .add_hw_decoder("mediacodec_ndk")
            .build()
            .unwrap();
        assert_eq!(config.audio_output, "opensles");
        assert_eq!(config.hw_decoders, vec!["mediacodec_ndk".to_string()]);
        assert!(config.apply_default_media_options);
        assert_eq!(config.default_parse_flags, ParseFlags::FETCH_LOCAL);
    }

    #[test]
    fn codec_options() {
        let none = EngineConfig::default();
        assert_eq!(none.codec_options(true, true), vec![":codec=all"]);

        let mut some = EngineConfigBuilder::default()
            .add_hw_decoder("a")
            .add_hw_decoder("b")
            .build()
            .unwrap();
        assert_eq!(some.codec_options(false, true), vec![":codec=all"]);
        assert_eq!(
            some.codec_options(true, false).last().unwrap(),
            ":codec=a,b,all"
        );

        some.hw_decoders_known = false;
        assert_eq!(some.codec_options(true, false), vec![":codec=all"]);
        assert_eq!(
            some.codec_options(true, true).last().unwrap(),
            ":codec=a,b,all"
        );
    }
}

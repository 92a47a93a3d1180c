use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::sync::LazyLock;
use unic_langid::LanguageIdentifier;
use anyhow::{anyhow, Result};

/// Language used when Telegram does not tell us the user's locale
pub const DEFAULT_LANGUAGE: &str = "ru";

/// Language used when a key or a locale is missing
const FALLBACK_LANGUAGE: &str = "en";

const RESOURCES: [(&str, &str); 2] = [
    ("en", include_str!("../locales/en/main.ftl")),
    ("ru", include_str!("../locales/ru/main.ftl")),
];

/// Localization manager for the bot
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a new localization manager with every bundled locale loaded
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();

        for (code, source) in RESOURCES {
            let locale: LanguageIdentifier = code.parse()?;
            bundles.insert(code.to_string(), Self::create_bundle(locale, source)?);
        }

        Ok(Self { bundles })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(locale: LanguageIdentifier, source: &str) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Plain-text chat messages; no bidi isolation marks around arguments
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("Invalid Fluent resource: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Duplicate Fluent messages: {errors:?}"))?;

        Ok(bundle)
    }

    /// Whether a bundle exists for the language code
    pub fn is_language_supported(&self, language: &str) -> bool {
        self.bundles.contains_key(language)
    }

    /// Resolve the bundle to use for a Telegram language code such as `ru` or `en-US`
    fn bundle_for(&self, language: &str) -> &FluentBundle<FluentResource> {
        let primary = language.split(['-', '_']).next().unwrap_or(language);
        self.bundles
            .get(primary)
            .or_else(|| self.bundles.get(FALLBACK_LANGUAGE))
            .expect("fallback locale is bundled at compile time")
    }

    /// Get a localized message in a specific language, falling back to English
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let mut bundle = self.bundle_for(language);
        if bundle.get_message(key).is_none() {
            bundle = self.bundle_for(FALLBACK_LANGUAGE);
        }

        let Some(pattern) = bundle.get_message(key).and_then(|msg| msg.value()) else {
            return format!("Missing translation: {key}");
        };

        let fluent_args = args.map(|args| {
            FluentArgs::from_iter(args.iter().map(|(k, v)| (*k, FluentValue::from(*v))))
        });

        let mut errors = vec![];
        bundle
            .format_pattern(pattern, fluent_args.as_ref(), &mut errors)
            .into_owned()
    }
}

static LOCALIZATION_MANAGER: LazyLock<LocalizationManager> = LazyLock::new(|| {
    LocalizationManager::new().expect("bundled locales must parse")
});

/// Get the global localization manager
pub fn get_localization_manager() -> &'static LocalizationManager {
    &LOCALIZATION_MANAGER
}

/// Localized message for an optional Telegram language code
pub fn t_lang(key: &str, language: Option<&str>) -> String {
    get_localization_manager().get_message_in_language(
        key,
        language.unwrap_or(DEFAULT_LANGUAGE),
        None,
    )
}

/// Localized message with arguments for an optional Telegram language code
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language: Option<&str>) -> String {
    let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
    get_localization_manager().get_message_in_language(
        key,
        language.unwrap_or(DEFAULT_LANGUAGE),
        Some(&args_map),
    )
}

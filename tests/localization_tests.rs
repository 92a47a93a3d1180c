//! # Localization Tests
//!
//! Message lookup, language fallback and argument formatting for the
//! bundled English and Russian locales.

use shift_ledger::localization::{t_args_lang, t_lang, LocalizationManager, DEFAULT_LANGUAGE};
use std::collections::HashMap;

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_localization() -> LocalizationManager {
        LocalizationManager::new().expect("Failed to create localization manager")
    }

    #[test]
    fn test_bundled_languages() {
        let manager = setup_localization();
        assert!(manager.is_language_supported("en"));
        assert!(manager.is_language_supported("ru"));
        assert!(!manager.is_language_supported("fr"));
        assert_eq!(DEFAULT_LANGUAGE, "ru");
    }

    #[test]
    fn test_get_message_existing_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("help", "en", None);
        assert!(message.contains("/start"));
        assert!(message.contains("/cancel"));
    }

    #[test]
    fn test_get_message_nonexistent_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("nonexistent-key", "en", None);
        assert_eq!(message, "Missing translation: nonexistent-key");
    }

    #[test]
    fn test_unsupported_language_falls_back_to_english() {
        let manager = setup_localization();

        let fallback = manager.get_message_in_language("cancelled", "de", None);
        let english = manager.get_message_in_language("cancelled", "en", None);
        assert_eq!(fallback, english);
    }

    #[test]
    fn test_region_subtag_is_ignored() {
        let manager = setup_localization();

        assert_eq!(
            manager.get_message_in_language("prompt-name", "ru-RU", None),
            "Имя работника:"
        );
        assert_eq!(
            manager.get_message_in_language("prompt-name", "en-GB", None),
            "Worker name:"
        );
    }

    #[test]
    fn test_message_with_args() {
        let manager = setup_localization();
        let mut args = HashMap::new();
        args.insert("sheet", "TR");

        let message = manager.get_message_in_language("row-saved", "en", Some(&args));
        assert_eq!(message, "Saved to sheet TR. Send /start for a new entry.");
    }

    #[test]
    fn test_progress_prefix_has_no_isolation_marks() {
        let message = t_args_lang(
            "prompt-progress",
            &[("current", "3"), ("total", "7"), ("prompt", "Amount:")],
            Some("en"),
        );
        assert_eq!(message, "(3/7) Amount:");
    }

    #[test]
    fn test_missing_language_code_uses_default() {
        assert_eq!(t_lang("nothing-to-cancel", None), "Нет активной записи.");
    }

    #[test]
    fn test_every_key_exists_in_both_locales() {
        let manager = setup_localization();
        let keys = [
            "welcome",
            "help",
            "choose-mode",
            "choose-mode-invalid",
            "choose-submode",
            "choose-submode-invalid",
            "prompt-date",
            "prompt-name",
            "prompt-work-type",
            "prompt-amount",
            "prompt-overtime",
            "prompt-dincel",
            "prompt-helper",
            "prompt-earned",
            "prompt-time",
            "answer-empty",
            "save-failed-retry",
            "save-failed",
            "cancelled",
            "nothing-to-cancel",
            "text-only",
        ];

        for key in keys {
            let en = manager.get_message_in_language(key, "en", None);
            let ru = manager.get_message_in_language(key, "ru", None);
            assert!(!en.starts_with("Missing translation"), "en missing {key}");
            assert_ne!(en, ru, "ru falls back to en for {key}");
        }
    }
}

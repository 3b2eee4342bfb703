/*!
 * Tests for language code utilities
 */

use subtrans::language_utils::{
    display_language_name, get_language_name, jellyfin_language_code, language_codes_match,
    normalize_to_part2t, output_language_code,
};

#[test]
fn test_output_language_code_withCommonNames_shouldUseTable() {
    assert_eq!(output_language_code("Spanish"), "spa");
    assert_eq!(output_language_code("french"), "fre");
    assert_eq!(output_language_code(" German "), "ger");
}

#[test]
fn test_output_language_code_withIsoCode_shouldResolveThroughIsolang() {
    assert_eq!(output_language_code("es"), "spa");
    assert_eq!(output_language_code("nl"), "dut");
}

#[test]
fn test_output_language_code_withAnySpelling_shouldAgree() {
    for spelling in ["French", "fr", "fre", "fra", "FR"] {
        assert_eq!(output_language_code(spelling), "fre", "spelling {}", spelling);
    }
    for spelling in ["German", "de", "ger", "deu"] {
        assert_eq!(output_language_code(spelling), "ger", "spelling {}", spelling);
    }
    assert_eq!(output_language_code("zh"), output_language_code("Chinese"));
}

#[test]
fn test_output_language_code_withUnknownName_shouldTakeFirstThreeLetters() {
    assert_eq!(output_language_code("Klingonish"), "kli");
}

#[test]
fn test_normalize_to_part2t_withBibliographicCode_shouldMapToTerminological() {
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("GER").unwrap(), "deu");
    assert_eq!(normalize_to_part2t("en").unwrap(), "eng");
    assert!(normalize_to_part2t("zz").is_err());
    assert!(normalize_to_part2t("english").is_err());
}

#[test]
fn test_language_codes_match_withMixedCodeForms_shouldCompareLanguages() {
    assert!(language_codes_match("fr", "fre"));
    assert!(language_codes_match("fra", "fre"));
    assert!(!language_codes_match("en", "de"));
    assert!(!language_codes_match("zz", "zz"));
}

#[test]
fn test_get_language_name_withCode_shouldReturnEnglishName() {
    assert_eq!(get_language_name("fr").unwrap(), "French");
    assert_eq!(get_language_name("spa").unwrap(), "Spanish");
}

#[test]
fn test_display_language_name_shouldExpandCodesOnly() {
    assert_eq!(display_language_name("es"), "Spanish");
    assert_eq!(display_language_name("Brazilian Portuguese"), "Brazilian Portuguese");
}

#[test]
fn test_jellyfin_language_code_shouldPreferTwoLetterCodes() {
    assert_eq!(jellyfin_language_code("eng").as_deref(), Some("en"));
    assert_eq!(jellyfin_language_code("Spanish").as_deref(), Some("es"));
    assert_eq!(jellyfin_language_code("S01E01"), None);
}

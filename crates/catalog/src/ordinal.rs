//! Chapter ordinal extraction.
//!
//! Titles carry their position as "第 ⟨numeral⟩ 章" where the numeral is
//! either Arabic digits or a Chinese numeral compound. The ordinal is only
//! ever a sort key; it never decides whether a document exists.

use crate::consts::{BARE_CHAPTER_MARKER_REGEX, CHAPTER_MARKER_REGEX};

/// Extract the chapter ordinal from a title.
///
/// A "第…章" marker anywhere in the title takes precedence over a bare
/// "…章" ending, so words such as "终章" never shadow the real marker.
///
/// Returns `None` when the title has no chapter marker, or when the text
/// between the markers contains anything other than a recognised numeral.
///
/// ```
/// use folio_catalog::parse_ordinal;
/// assert_eq!(parse_ordinal("第1章"), Some(1));
/// assert_eq!(parse_ordinal("第二十三章 风起"), Some(23));
/// assert_eq!(parse_ordinal("一百零五章"), Some(105));
/// assert_eq!(parse_ordinal("章"), None);
/// assert_eq!(parse_ordinal("序章"), None);
/// ```
pub fn parse_ordinal(title: &str) -> Option<u64> {
    let captures = CHAPTER_MARKER_REGEX
        .captures(title)
        .or_else(|| BARE_CHAPTER_MARKER_REGEX.captures(title))?;
    let numeral = captures.get(1)?.as_str();
    if numeral.chars().all(|c| c.is_ascii_digit()) {
        return numeral.parse().ok();
    }
    parse_chinese(numeral)
}

fn digit(c: char) -> Option<u64> {
    Some(match c {
        '零' | '〇' => 0,
        '一' => 1,
        '二' | '两' => 2,
        '三' => 3,
        '四' => 4,
        '五' => 5,
        '六' => 6,
        '七' => 7,
        '八' => 8,
        '九' => 9,
        _ => return None,
    })
}

fn multiplier(c: char) -> Option<u64> {
    Some(match c {
        '十' => 10,
        '百' => 100,
        '千' => 1_000,
        '万' => 10_000,
        _ => return None,
    })
}

/// Place-value evaluation: a multiplier applies to the most recent digit (or
/// to an implicit 1), the group is added to the total and the digit resets.
fn parse_chinese(numeral: &str) -> Option<u64> {
    let mut total: u64 = 0;
    let mut unit: Option<u64> = None;
    for c in numeral.chars() {
        if let Some(value) = digit(c) {
            unit = Some(value);
            continue;
        }
        let group = unit.take().unwrap_or(1).checked_mul(multiplier(c)?)?;
        total = total.checked_add(group)?;
    }
    total.checked_add(unit.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("二十三章", Some(23))]
    #[case("一百零五章", Some(105))]
    #[case("十二章", Some(12))]
    #[case("第十章", Some(10))]
    #[case("第一千二百三十四章", Some(1234))]
    #[case("第两百章", Some(200))]
    #[case("第一万零一章", Some(10001))]
    #[case("第〇章", Some(0))]
    #[case("第二章", Some(2))]
    fn test_chinese_numerals(#[case] title: &str, #[case] expected: Option<u64>) {
        assert_eq!(parse_ordinal(title), expected);
    }

    #[rstest]
    #[case("第1章", Some(1))]
    #[case("第10章.txt", Some(10))]
    #[case("第 12 章 重逢", Some(12))]
    #[case("007章", Some(7))]
    #[case("终章 第3章", Some(3))]
    #[case("篇章第3章", Some(3))]
    #[case("第99999999999999999999999章", None)]
    fn test_arabic_numerals(#[case] title: &str, #[case] expected: Option<u64>) {
        assert_eq!(parse_ordinal(title), expected);
    }

    #[rstest]
    #[case("章")]
    #[case("")]
    #[case("1.txt")]
    #[case("序章")]
    #[case("第X章")]
    #[case("第二x章")]
    #[case("第1十章")]
    #[case("人物设定")]
    fn test_no_ordinal(#[case] title: &str) {
        assert_eq!(parse_ordinal(title), None);
    }

    #[test]
    fn test_first_marker_wins() {
        assert_eq!(parse_ordinal("第三章 回忆第一章"), Some(3));
    }

    #[test]
    fn test_matches_manual_place_value() {
        let tens = ["", "十", "二十", "三十", "四十", "五十", "六十", "七十", "八十", "九十"];
        let ones = ["", "一", "二", "三", "四", "五", "六", "七", "八", "九"];
        for (t, tens_text) in tens.iter().enumerate() {
            for (o, ones_text) in ones.iter().enumerate() {
                let numeral = format!("{tens_text}{ones_text}");
                if numeral.is_empty() {
                    continue;
                }
                let expected = (t * 10 + o) as u64;
                assert_eq!(parse_ordinal(&format!("第{numeral}章")), Some(expected), "{numeral}");
            }
        }
    }
}

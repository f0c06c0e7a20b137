//! 캐시 참조 정리.

use std::collections::HashMap;

use trader_core::KlineCacheReference;

use crate::keys::normalize_key;

/// 캐시 참조 중복 제거.
///
/// - URL: 공백 제거, 빈 문자열이면 `None`
/// - 키: 공백 및 선행 `/` 제거, 빈 키는 버림
/// - 같은 키는 나중 항목이 이김
/// - 출력 순서는 각 키가 처음 등장한 위치
pub fn dedupe_refs<I>(refs: I) -> Vec<KlineCacheReference>
where
    I: IntoIterator<Item = KlineCacheReference>,
{
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<KlineCacheReference> = Vec::new();

    for mut reference in refs {
        reference.key = normalize_key(&reference.key);
        if reference.key.is_empty() {
            continue;
        }
        reference.url = reference
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        match slots.get(&reference.key) {
            Some(&idx) => out[idx] = reference,
            None => {
                slots.insert(reference.key.clone(), out.len());
                out.push(reference);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use trader_core::Timeframe;

    fn reference(key: &str, count: usize, url: Option<&str>) -> KlineCacheReference {
        KlineCacheReference {
            key: key.to_string(),
            symbol: "BTCUSDT".to_string(),
            timeframe: Timeframe::M15,
            from_ms: 0,
            to_ms: 1,
            candle_count: count,
            url: url.map(str::to_string),
        }
    }

    #[test]
    fn same_key_collapses_to_last_supplied() {
        let refs = vec![
            reference("klines/a.json", 1, None),
            reference("/klines/a.json", 2, Some("x")),
            reference(" klines/a.json ", 3, Some("  ")),
        ];
        let out = dedupe_refs(refs);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].candle_count, 3);
        assert_eq!(out[0].key, "klines/a.json");
        assert_eq!(out[0].url, None);
    }

    #[test]
    fn order_follows_first_appearance() {
        let refs = vec![
            reference("a", 1, None),
            reference("b", 1, None),
            reference("a", 2, Some(" file:///a ")),
            reference("", 9, None),
        ];
        let out = dedupe_refs(refs);
        let keys: Vec<&str> = out.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(out[0].candle_count, 2);
        assert_eq!(out[0].url.as_deref(), Some("file:///a"));
    }
}

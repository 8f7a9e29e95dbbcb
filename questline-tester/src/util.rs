use anyhow::{Context, Result};

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse `--seeds`, accepting decimal or `0x`-prefixed hex.
pub fn parse_seeds(tokens: &[String]) -> Result<Vec<u64>> {
    tokens
        .iter()
        .map(|token| {
            let parsed = match token.strip_prefix("0x") {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => token.parse::<u64>(),
            };
            parsed.with_context(|| format!("invalid seed '{token}'"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_skips_blanks() {
        assert_eq!(split_csv(" smoke, ,resume,"), vec!["smoke", "resume"]);
    }

    #[test]
    fn seeds_accept_hex_and_reject_garbage() {
        let seeds = parse_seeds(&split_csv("1337,0xff")).unwrap();
        assert_eq!(seeds, vec![1337, 255]);
        let err = parse_seeds(&["banana".to_string()]).unwrap_err();
        assert!(err.to_string().contains("banana"));
    }
}

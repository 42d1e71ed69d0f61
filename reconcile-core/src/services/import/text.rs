//! Text folding shared by header matching, type vocabulary and month names

/// Trim, lowercase and strip Portuguese diacritics
pub(crate) fn fold(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold() {
        assert_eq!(fold("  Descrição "), "descricao");
        assert_eq!(fold("CRÉDITO"), "credito");
        assert_eq!(fold("Transação"), "transacao");
        assert_eq!(fold("Março"), "marco");
    }
}

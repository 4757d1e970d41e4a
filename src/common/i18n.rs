// src/common/i18n.rs

use std::collections::HashMap;

use anyhow::Context;

// Idioma usado quando o do operador não tem tradução
pub const FALLBACK_LANG: &str = "pt";

// Os arquivos de tradução entram no binário em tempo de compilação.
const BUNDLED_LOCALES: [(&str, &str); 2] = [
    ("pt", include_str!("../../locales/pt.json")),
    ("en", include_str!("../../locales/en.json")),
];

/// Mensagens traduzidas, indexadas por idioma e depois por código.
#[derive(Debug, Clone, Default)]
pub struct I18nStore {
    messages: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn load() -> anyhow::Result<Self> {
        let mut messages = HashMap::new();
        for (lang, raw) in BUNDLED_LOCALES {
            let table: HashMap<String, String> = serde_json::from_str(raw)
                .with_context(|| format!("Arquivo de tradução inválido: {}", lang))?;
            messages.insert(lang.to_string(), table);
        }
        Ok(Self { messages })
    }

    fn lookup(&self, lang: &str, key: &str) -> Option<&str> {
        self.messages
            .get(lang)
            .and_then(|table| table.get(key))
            .or_else(|| {
                self.messages
                    .get(FALLBACK_LANG)
                    .and_then(|table| table.get(key))
            })
            .map(String::as_str)
    }

    /// Traduz `code`, trocando "{0}" pelo argumento (também traduzido, se houver `arg.<valor>`).
    pub fn translate(&self, lang: &str, code: &str, arg: Option<&str>) -> String {
        let template = self.lookup(lang, code).unwrap_or(code);

        match arg {
            Some(raw) => {
                let arg_key = format!("arg.{}", raw);
                let arg_text = self.lookup(lang, &arg_key).unwrap_or(raw);
                template.replace("{0}", arg_text)
            }
            None => template.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_portuguese() {
        let store = I18nStore::load().unwrap();
        assert_eq!(
            store.translate("de", "default_stage_locked", None),
            "Etapas padrão não podem ser excluídas."
        );
    }

    #[test]
    fn translates_argument() {
        let store = I18nStore::load().unwrap();
        assert_eq!(
            store.translate("pt", "required_field", Some("name")),
            "O campo nome é obrigatório."
        );
        assert_eq!(
            store.translate("en", "resource_not_found", Some("stage")),
            "Stage not found."
        );
    }

    #[test]
    fn unknown_code_is_returned_as_is() {
        let store = I18nStore::load().unwrap();
        assert_eq!(store.translate("en", "no_such_code", None), "no_such_code");
    }
}

//! # Parámetros de query
//! src/http/query.rs
//!
//! Separa una query string en pares `key=value`. No decodifica `%XX` ni `+`:
//! los handlers reciben los valores tal como vinieron en el cable.
//!
//! Ejemplo: "receipt_id=10&debug"
//! Retorna: [("receipt_id", "10"), ("debug", "")]

/// Parámetros de una query string, en orden de aparición
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams<'a> {
    params: Vec<(&'a str, &'a str)>,
}

impl<'a> QueryParams<'a> {
    pub fn parse(query: &'a str) -> Self {
        let params = query
            .split('&')
            .filter(|param| !param.is_empty())
            .map(|param| param.split_once('=').unwrap_or((param, "")))
            .collect();
        Self { params }
    }

    /// Primer valor para `key`
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.iter().any(|(k, _)| *k == key)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.params.iter().copied()
    }
}

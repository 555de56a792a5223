//! # Lista de headers
//! src/http/headers.rs
//!
//! Secuencia ordenada de pares `Key: Value`:
//! - Se preserva el orden de inserción
//! - Se permiten claves duplicadas (en la lectura gana la primera)
//! - Las claves se comparan sin distinguir mayúsculas

use std::fmt;

/// Un header HTTP con clave y valor propios
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub key: String,
    pub value: String,
}

impl Header {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Compara la clave sin distinguir mayúsculas
    pub fn is(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }
}

/// Lista ordenada de headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    headers: Vec<Header>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un header al final, aunque la clave ya exista
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.push(Header::new(key, value));
    }

    /// Primer valor para `key`
    ///
    /// # Ejemplo
    /// ```
    /// use pool_http::http::HeaderList;
    ///
    /// let mut headers = HeaderList::new();
    /// headers.push("Content-Type", "text/plain");
    /// assert_eq!(headers.get("content-type"), Some("text/plain"));
    /// ```
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.is(key))
            .map(|h| h.value.as_str())
    }

    /// Todos los valores para `key`, en orden de llegada
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|h| h.is(key))
            .map(|h| h.value.as_str())
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.headers.iter().any(|h| h.is(key))
    }

    /// Elimina todas las apariciones de `key` y retorna cuántas había
    pub fn remove(&mut self, key: &str) -> usize {
        let before = self.headers.len();
        self.headers.retain(|h| !h.is(key));
        before - self.headers.len()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.headers.iter()
    }
}

impl fmt::Display for HeaderList {
    /// Formato de cable: `Key: Value\r\n` por header
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for header in &self.headers {
            write!(f, "{}: {}\r\n", header.key, header.value)?;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderList {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = HeaderList::new();
        for (key, value) in iter {
            headers.push(key, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut headers = HeaderList::new();
        headers.push("Content-Type", "application/json");

        assert_eq!(headers.get("Content-Type"), Some("application/json"));
        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
        assert!(headers.contains("content-TYPE"));

        let mut lower = HeaderList::new();
        lower.push("content-type", "text/html");
        assert_eq!(lower.get("Content-Type"), lower.get("content-type"));
    }

    #[test]
    fn test_duplicates_first_wins() {
        let mut headers = HeaderList::new();
        headers.push("Set-Cookie", "a=1");
        headers.push("set-cookie", "b=2");

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("Set-Cookie"), Some("a=1"));
        assert_eq!(headers.get_all("SET-COOKIE"), vec!["a=1", "b=2"]);
    }

    #[test]
    fn test_insertion_order() {
        let headers: HeaderList = vec![("B", "2"), ("A", "1"), ("C", "3")].into_iter().collect();
        let keys: Vec<&str> = headers.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_remove() {
        let mut headers = HeaderList::new();
        headers.push("X-A", "1");
        headers.push("Connection", "keep-alive");
        headers.push("connection", "upgrade");

        assert_eq!(headers.remove("CONNECTION"), 2);
        assert_eq!(headers.len(), 1);
        assert!(!headers.contains("connection"));
    }

    #[test]
    fn test_missing_key() {
        let headers = HeaderList::new();
        assert!(headers.is_empty());
        assert_eq!(headers.get("Host"), None);
    }

    #[test]
    fn test_display_wire_format() {
        let headers: HeaderList = vec![("Host", "x"), ("Accept", "*/*")].into_iter().collect();
        assert_eq!(headers.to_string(), "Host: x\r\nAccept: */*\r\n");
    }
}

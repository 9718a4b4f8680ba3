//! Configuration access port.

/// Sectioned key/value configuration. Section and key names are matched
/// case-insensitively by the INI adapter. Values are raw strings; typed
/// parsing and validation live in `domain::config_validation`.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// All section names, sorted.
    fn sections(&self) -> Vec<String>;

    /// Keys of one section, sorted; empty when the section is absent.
    fn keys(&self, section: &str) -> Vec<String>;
}

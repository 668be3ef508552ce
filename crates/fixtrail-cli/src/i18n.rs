// crates/fixtrail-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Provides message catalog and translation utilities for the CLI.
// Purpose: Centralize user-facing strings in English and Portuguese.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The fixtrail CLI stores user-facing strings in a small translation catalog
//! so operator output reads the same in every command. English is the
//! baseline; Portuguese mirrors the wording of the mobile tracker the agent
//! replaces. All runtime output should be routed through the
//! [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to English and then to the key itself.
//! - Placeholder substitutions preserve deterministic order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported CLI locales.
///
/// # Invariants
/// - Variants are stable for CLI parsing and catalog lookup.
/// - [`Locale::En`] is the default fallback locale.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Locale {
    /// English (default).
    En,
    /// Portuguese.
    Pt,
}

impl Locale {
    /// Returns the canonical locale label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Pt => "pt",
        }
    }

    /// Attempts to parse a locale value (case-insensitive, tolerant of region tags).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        let normalized = value.to_ascii_lowercase();
        let lang = normalized.split(['-', '_', '.']).next().unwrap_or("");
        match lang {
            "en" => Some(Self::En),
            "pt" => Some(Self::Pt),
            _ => None,
        }
    }
}

/// Ordered list of supported CLI locales.
///
/// # Invariants
/// - Ordering is stable for deterministic presentation.
pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::En, Locale::Pt];

/// A formatted message argument captured by the [`macro@crate::t`] macro.
///
/// # Invariants
/// - `key` matches a placeholder name without braces (for example, `path`).
/// - `value` is preformatted and should be safe for display.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Locale Selection
// ============================================================================

/// Global locale selection for CLI output.
static CURRENT_LOCALE: OnceLock<Locale> = OnceLock::new();

/// Sets the CLI locale. Only the first call wins.
pub fn set_locale(locale: Locale) {
    let _ = CURRENT_LOCALE.set(locale);
}

/// Returns the current CLI locale (defaults to English).
#[must_use]
pub fn current_locale() -> Locale {
    CURRENT_LOCALE.get().copied().unwrap_or(Locale::En)
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static English catalog entries.
const CATALOG_EN: &[(&str, &str)] = &[
    ("main.version", "fixtrail {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("i18n.lang.invalid_env", "Invalid {env} value: {value}. Expected 'en' or 'pt'."),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.check.ok", "Config valid (server {server}, store {store})"),
    ("collector.server_url.blank", "Enter the server address"),
    ("collector.server_url.invalid", "Invalid server address: {error}"),
    (
        "collector.device_id.missing",
        "No device id: pass --device-id, set collector.device_id, or provide {path}",
    ),
    ("collector.device_id.invalid", "Invalid device id: {error}"),
    ("events.open_failed", "Failed to open event log {path}: {error}"),
    ("store.open_failed", "Failed to open sample store at {path}: {error}"),
    ("store.read_failed", "Failed to read sample store: {error}"),
    ("store.write_failed", "Failed to write sample store: {error}"),
    ("record.invalid", "Invalid fix: {error}"),
    ("record.ok", "Fix {id} recorded"),
    ("list.render_failed", "Failed to render stored fixes: {error}"),
    ("status.count", "Saved locations: {count}"),
    ("status.server", "Server: {url}"),
    ("status.device", "Device: {device}"),
    ("status.device.unset", "Device: not configured"),
    ("status.sampling", "Sampling: every {interval} ms, at most one fix per {fastest} ms"),
    ("status.upload.manual", "Uploads: manual"),
    ("status.upload.scheduled", "Uploads: every {secs} s while tracking"),
    ("status.metered.allowed", "Metered networks: allowed"),
    ("status.metered.confirm", "Metered networks: confirmation required"),
    ("upload.client_failed", "Failed to initialize the HTTP client: {error}"),
    ("upload.success", "{count} locations sent successfully"),
    ("upload.empty", "No locations to send"),
    ("upload.network_failure", "Network error: {error}"),
    ("upload.server_rejected", "Server error: {status}"),
    ("upload.failed", "Upload failed: {error}"),
    ("clear.confirm_required", "Refusing to delete {count} saved locations without --yes"),
    ("clear.ok", "Deleted {count} saved locations"),
    ("track.input_failed", "Failed to open sampler input {path}: {error}"),
    ("track.runtime_failed", "Failed to start the async runtime: {error}"),
    ("track.start_failed", "Failed to start sampling: {error}"),
    ("track.started", "Tracking started; press Ctrl-C to stop"),
    (
        "track.stopped",
        "Tracking stopped: {recorded} recorded, {dropped} dropped, {throttled} throttled",
    ),
];

/// Static Portuguese catalog entries.
const CATALOG_PT: &[(&str, &str)] = &[
    ("main.version", "fixtrail {version}"),
    ("output.stream.stdout", "saída padrão"),
    ("output.stream.stderr", "saída de erro"),
    ("output.stream.unknown", "saída"),
    ("output.write_failed", "Falha ao escrever em {stream}: {error}"),
    ("i18n.lang.invalid_env", "Valor inválido para {env}: {value}. Esperado 'en' ou 'pt'."),
    ("config.load_failed", "Falha ao carregar a configuração: {error}"),
    ("config.check.ok", "Configuração válida (servidor {server}, banco {store})"),
    ("collector.server_url.blank", "Digite o endereço do servidor"),
    ("collector.server_url.invalid", "Endereço do servidor inválido: {error}"),
    (
        "collector.device_id.missing",
        "Sem identificador do dispositivo: use --device-id, defina collector.device_id ou \
         forneça {path}",
    ),
    ("collector.device_id.invalid", "Identificador do dispositivo inválido: {error}"),
    ("events.open_failed", "Falha ao abrir o registro de eventos {path}: {error}"),
    ("store.open_failed", "Falha ao abrir o banco de localizações em {path}: {error}"),
    ("store.read_failed", "Falha ao ler o banco de localizações: {error}"),
    ("store.write_failed", "Falha ao gravar no banco de localizações: {error}"),
    ("record.invalid", "Localização inválida: {error}"),
    ("record.ok", "Localização {id} salva"),
    ("list.render_failed", "Falha ao exibir as localizações salvas: {error}"),
    ("status.count", "Localizações salvas: {count}"),
    ("status.server", "Servidor: {url}"),
    ("status.device", "Dispositivo: {device}"),
    ("status.device.unset", "Dispositivo: não configurado"),
    ("status.sampling", "Rastreamento: a cada {interval} ms, no máximo uma a cada {fastest} ms"),
    ("status.upload.manual", "Envios: manuais"),
    ("status.upload.scheduled", "Envios: a cada {secs} s durante o rastreamento"),
    ("status.metered.allowed", "Redes móveis: permitidas"),
    ("status.metered.confirm", "Redes móveis: exigem confirmação"),
    ("upload.client_failed", "Falha ao iniciar o cliente HTTP: {error}"),
    ("upload.success", "{count} localizações enviadas com sucesso"),
    ("upload.empty", "Nenhuma localização para enviar"),
    ("upload.network_failure", "Erro de rede: {error}"),
    ("upload.server_rejected", "Erro no servidor: {status}"),
    ("upload.failed", "Falha no envio: {error}"),
    ("clear.confirm_required", "Recusando apagar {count} localizações salvas sem --yes"),
    ("clear.ok", "{count} localizações apagadas"),
    ("track.input_failed", "Falha ao abrir a entrada de localizações {path}: {error}"),
    ("track.runtime_failed", "Falha ao iniciar o runtime assíncrono: {error}"),
    ("track.start_failed", "Falha ao iniciar o rastreamento: {error}"),
    ("track.started", "Rastreamento iniciado; pressione Ctrl-C para parar"),
    (
        "track.stopped",
        "Rastreamento parado: {recorded} salvas, {dropped} descartadas, {throttled} ignoradas",
    ),
];

/// Returns the message catalog for the requested locale.
pub(crate) fn catalog_for(locale: Locale) -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_EN_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    static CATALOG_PT_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    match locale {
        Locale::En => CATALOG_EN_MAP.get_or_init(|| CATALOG_EN.iter().copied().collect()),
        Locale::Pt => CATALOG_PT_MAP.get_or_init(|| CATALOG_PT.iter().copied().collect()),
    }
}

/// Returns the raw catalog entries for the requested locale.
#[cfg(test)]
pub(crate) const fn catalog_entries_for(locale: Locale) -> &'static [(&'static str, &'static str)] {
    match locale {
        Locale::En => CATALOG_EN,
        Locale::Pt => CATALOG_PT,
    }
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` using the selected locale while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let locale = current_locale();
    let template = catalog_for(locale)
        .get(key)
        .copied()
        .or_else(|| catalog_for(Locale::En).get(key).copied())
        .unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
///
/// # Returns
///
/// A localized [`String`] with placeholders substituted.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}

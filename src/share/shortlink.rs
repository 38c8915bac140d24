use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;

use crate::foundation::core::now_ms;
use crate::foundation::error::{AutopostError, AutopostResult};
use crate::foundation::fs::{ensure_parent_dir, write_atomic};
use crate::foundation::math::{fnv1a64_str, to_base36};

/// Length of generated codes.
pub const CODE_LEN: usize = 7;

/// One stored short link.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Shortlink {
    /// Short code.
    pub code: String,
    /// Destination URL.
    pub target: String,
    /// Creation time, unix milliseconds.
    pub created_ms: u64,
}

/// One click event, appended to the click log.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClickEvent {
    /// Short code that was followed.
    pub code: String,
    /// Click time, unix milliseconds.
    pub at_ms: u64,
    /// Client user agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// HTTP referrer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

#[derive(Default, serde::Serialize, serde::Deserialize)]
struct Table {
    #[serde(default)]
    links: BTreeMap<String, Shortlink>,
}

struct State {
    table: Table,
    by_target: BTreeMap<String, String>,
}

/// URL shortener persisted as a JSON table plus an append-only JSON-lines click log.
///
/// `shorten` is create-or-get under one lock, so concurrent calls for the same URL agree on a code.
pub struct ShortlinkStore {
    table_path: PathBuf,
    clicks_path: PathBuf,
    base_url: String,
    state: Mutex<State>,
}

impl ShortlinkStore {
    /// Open (or create) the store.
    pub fn open(
        table_path: impl Into<PathBuf>,
        clicks_path: impl Into<PathBuf>,
        base_url: &str,
    ) -> AutopostResult<Self> {
        let table_path = table_path.into();
        let table: Table = match std::fs::read(&table_path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AutopostError::serde(format!("shortlink table '{}': {e}", table_path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Table::default(),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("read '{}'", table_path.display()))
                    .into());
            }
        };
        let by_target = table
            .links
            .values()
            .map(|l| (l.target.clone(), l.code.clone()))
            .collect();
        Ok(Self {
            table_path,
            clicks_path: clicks_path.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            state: Mutex::new(State { table, by_target }),
        })
    }

    /// Code for `url`, creating it on first use.
    pub fn shorten(&self, url: &str) -> AutopostResult<Shortlink> {
        let url = validate_target(url)?;
        let mut st = self.lock()?;
        if let Some(code) = st.by_target.get(url)
            && let Some(link) = st.table.links.get(code)
        {
            return Ok(link.clone());
        }

        let mut salt = 0u64;
        let code = loop {
            let mut c = to_base36(fnv1a64_str(url, salt));
            c.truncate(CODE_LEN);
            if !st.table.links.contains_key(&c) {
                break c;
            }
            salt += 1;
        };
        let link = Shortlink {
            code: code.clone(),
            target: url.to_string(),
            created_ms: now_ms(),
        };
        st.table.links.insert(code.clone(), link.clone());
        st.by_target.insert(url.to_string(), code.clone());
        if let Err(e) = self.persist(&st.table) {
            st.table.links.remove(&code);
            st.by_target.remove(url);
            return Err(e);
        }
        tracing::info!(code = %link.code, url = %link.target, "shortlink created");
        Ok(link)
    }

    /// Look up a code.
    pub fn resolve(&self, code: &str) -> AutopostResult<Shortlink> {
        let st = self.lock()?;
        st.table
            .links
            .get(code)
            .cloned()
            .ok_or_else(|| AutopostError::not_found(format!("shortlink '{code}'")))
    }

    /// Resolve `code` and append a click event; returns the destination.
    pub fn record_click(
        &self,
        code: &str,
        user_agent: Option<&str>,
        referrer: Option<&str>,
    ) -> AutopostResult<String> {
        let link = self.resolve(code)?;
        let event = ClickEvent {
            code: link.code,
            at_ms: now_ms(),
            user_agent: user_agent.map(str::to_string),
            referrer: referrer.map(str::to_string),
        };
        let mut line =
            serde_json::to_vec(&event).map_err(|e| AutopostError::serde(e.to_string()))?;
        line.push(b'\n');

        let _guard = self.lock()?;
        ensure_parent_dir(&self.clicks_path)?;
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.clicks_path)
            .with_context(|| format!("open '{}'", self.clicks_path.display()))?;
        f.write_all(&line)
            .with_context(|| format!("append '{}'", self.clicks_path.display()))?;
        Ok(link.target)
    }

    /// Click events for `code`, oldest first.
    pub fn clicks(&self, code: &str) -> AutopostResult<Vec<ClickEvent>> {
        let _guard = self.lock()?;
        let text = match std::fs::read_to_string(&self.clicks_path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("read '{}'", self.clicks_path.display()))
                    .into());
            }
        };
        Ok(text
            .lines()
            .filter_map(|l| serde_json::from_str::<ClickEvent>(l).ok())
            .filter(|e| e.code == code)
            .collect())
    }

    /// Public URL for a code: `<base>/go/<code>`.
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/go/{code}", self.base_url)
    }

    fn lock(&self) -> AutopostResult<std::sync::MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| AutopostError::Other(anyhow::anyhow!("shortlink store lock poisoned")))
    }

    fn persist(&self, table: &Table) -> AutopostResult<()> {
        let bytes =
            serde_json::to_vec_pretty(table).map_err(|e| AutopostError::serde(e.to_string()))?;
        write_atomic(&self.table_path, &bytes)
    }
}

/// Trimmed `url` if it is an absolute http(s) URL with a host, else a `bad_url` validation error.
pub fn validate_target(url: &str) -> AutopostResult<&str> {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(r) if !r.is_empty() && !r.starts_with('/') && !r.contains(char::is_whitespace) => {
            Ok(url)
        }
        _ => Err(AutopostError::validation(
            "bad_url",
            format!("target url must be an absolute http(s) url, got '{url}'"),
        )),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/share/shortlink.rs"]
mod tests;

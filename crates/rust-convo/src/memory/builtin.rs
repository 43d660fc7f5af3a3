//! Builtin scripting functions.
//!
//! A builtin is a reserved `$token` that resolves to a freshly computed
//! value (current time, random digits, a unique id) every time it is
//! substituted. The registry is immutable once built and is shared between
//! runs behind an [`Arc`].

use std::fmt;
use std::sync::{Arc, LazyLock};

use chrono::{Local, Utc};
use rand::Rng;

/// A function computing a builtin's value.
pub type BuiltinFn = Arc<dyn Fn() -> String + Send + Sync>;

/// A single builtin token and its function.
#[derive(Clone)]
pub struct Builtin {
    token: String,
    func: BuiltinFn,
}

impl Builtin {
    /// Create a builtin.
    pub fn new(token: impl Into<String>, func: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self {
            token: token.into(),
            func: Arc::new(func),
        }
    }

    /// Get the token, including its `$` prefix.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Compute the current value.
    #[must_use]
    pub fn call(&self) -> String {
        (self.func)()
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin").field("token", &self.token).finish()
    }
}

static STANDARD: LazyLock<Arc<BuiltinRegistry>> =
    LazyLock::new(|| Arc::new(BuiltinRegistry::build_standard()));

fn local_format(fmt: &'static str) -> impl Fn() -> String + Send + Sync + 'static {
    move || Local::now().format(fmt).to_string()
}

fn random_digits(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// An immutable set of builtins, iterated longest token first.
#[derive(Debug, Clone, Default)]
pub struct BuiltinRegistry {
    builtins: Vec<Builtin>,
}

impl BuiltinRegistry {
    /// Get the shared standard registry.
    #[must_use]
    pub fn standard() -> Arc<Self> {
        Arc::clone(&STANDARD)
    }

    /// Create a registry without builtins.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start building a custom registry.
    #[must_use]
    pub fn builder() -> BuiltinRegistryBuilder {
        BuiltinRegistryBuilder::new()
    }

    fn build_standard() -> Self {
        Self::builder()
            .add("$now", local_format("%m/%d/%Y, %-I:%M:%S %p"))
            .add("$now_EN", local_format("%m/%d/%Y %-I:%M:%S %p"))
            .add("$now_DE", local_format("%d.%m.%Y, %H:%M:%S"))
            .add("$now_ISO", || Local::now().to_rfc3339())
            .add("$date", local_format("%m/%d/%Y"))
            .add("$date_EN", local_format("%m/%d/%Y"))
            .add("$date_DE", local_format("%d.%m.%Y"))
            .add("$date_ISO", local_format("%Y-%m-%d"))
            .add("$time", local_format("%-I:%M:%S %p"))
            .add("$time_EN", local_format("%-I:%M %p"))
            .add("$time_DE", local_format("%H:%M"))
            .add("$time_ISO", local_format("%H:%M:%S"))
            .add("$time_HH_MM", local_format("%H:%M"))
            .add("$time_HH", local_format("%H"))
            .add("$time_H_A", local_format("%-I %p"))
            .add("$timestamp", || Utc::now().timestamp_millis().to_string())
            .add("$year", local_format("%Y"))
            .add("$month", local_format("%B"))
            .add("$month_MMM", local_format("%b"))
            .add("$day_of_month", local_format("%-d"))
            .add("$day_of_week", local_format("%A"))
            .add("$random10", || random_digits(10))
            .add("$uniqueId", || uuid::Uuid::new_v4().to_string())
            .build()
    }

    /// Iterate builtins, longest token first.
    pub fn iter(&self) -> impl Iterator<Item = &Builtin> {
        self.builtins.iter()
    }

    /// Iterate tokens, longest first.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.builtins.iter().map(Builtin::token)
    }

    /// Look up a builtin by exact token.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<&Builtin> {
        self.builtins.iter().find(|b| b.token == token)
    }

    /// Check if a token is reserved.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.get(token).is_some()
    }

    /// Find the builtin a variable name collides with.
    ///
    /// A name collides when it equals a builtin token or extends one
    /// (`$now_mine` collides with `$now`). The longest such token is returned.
    #[must_use]
    pub fn collision(&self, name: &str) -> Option<&str> {
        self.tokens().find(|token| name.starts_with(token))
    }

    /// Get the number of builtins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.builtins.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.builtins.is_empty()
    }
}

/// Builder for [`BuiltinRegistry`].
#[derive(Debug, Default)]
pub struct BuiltinRegistryBuilder {
    builtins: Vec<Builtin>,
}

impl BuiltinRegistryBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a builtin, replacing any earlier one with the same token.
    #[must_use]
    pub fn add(
        mut self,
        token: impl Into<String>,
        func: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        let builtin = Builtin::new(token, func);
        self.builtins.retain(|b| b.token != builtin.token);
        self.builtins.push(builtin);
        self
    }

    /// Add a builtin that always yields the same value.
    #[must_use]
    pub fn constant(self, token: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        self.add(token, move || value.clone())
    }

    /// Build the registry.
    #[must_use]
    pub fn build(mut self) -> BuiltinRegistry {
        self.builtins.sort_by(|a, b| {
            b.token
                .len()
                .cmp(&a.token.len())
                .then_with(|| a.token.cmp(&b.token))
        });
        BuiltinRegistry {
            builtins: self.builtins,
        }
    }
}

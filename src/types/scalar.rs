// ============================================================================
// Scalar Types and the Type Registry
// Nominal RealType/TextType values, the name registry and fresh-name pools
// ============================================================================

use crate::error::{Result, UnitFieldError};
use crate::sets::Discretization;
use crate::units::{can_convert, unit_label, Unit};
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

// ============================================================================
// RealType
// ============================================================================

#[derive(Debug)]
struct RealTypeInner {
    name: String,
    unit: Option<Unit>,
    interval: bool,
    discretization: OnceCell<Discretization>,
}

/// A named real-valued quantity.
///
/// Equality is nominal: two RealTypes are equal iff their names match,
/// however they were constructed. Clones share the write-once default
/// discretization.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(into = "crate::types::repr::RealTypeRepr", try_from = "crate::types::repr::RealTypeRepr")
)]
pub struct RealType(Arc<RealTypeInner>);

impl RealType {
    /// Create an unregistered RealType. Interval types keep only the
    /// absolute form of their unit.
    ///
    /// # Errors
    /// `MalformedType` for a name outside `[A-Za-z][A-Za-z0-9_]*`.
    pub fn new(name: &str, unit: Option<Unit>, interval: bool) -> Result<Self> {
        validate_name(name)?;
        let unit = if interval { unit.map(|u| u.absolute()) } else { unit };
        Ok(Self(Arc::new(RealTypeInner {
            name: name.to_string(),
            unit,
            interval,
            discretization: OnceCell::new(),
        })))
    }

    /// Look up or register `name` in the global registry.
    pub fn named(name: &str, unit: Option<Unit>) -> Result<Self> {
        TypeRegistry::global().get_or_create_real(name, unit, false)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[inline]
    pub fn default_unit(&self) -> Option<&Unit> {
        self.0.unit.as_ref()
    }

    #[inline]
    pub fn is_interval(&self) -> bool {
        self.0.interval
    }

    pub fn default_discretization(&self) -> Option<&Discretization> {
        self.0.discretization.get()
    }

    /// Attach the default discretization. It can be set once.
    ///
    /// # Errors
    /// `MalformedType` when a discretization is already attached.
    pub fn set_default_discretization(&self, discretization: Discretization) -> Result<()> {
        self.0.discretization.set(discretization).map_err(|_| {
            UnitFieldError::malformed(format!(
                "default discretization of {} is already set",
                self.name()
            ))
        })
    }

    /// Same underlying type object, not just the same name.
    #[inline]
    pub fn same_instance(&self, other: &RealType) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for RealType {
    fn eq(&self, other: &Self) -> bool {
        self.0.name == other.0.name
    }
}

impl Eq for RealType {}

impl std::hash::Hash for RealType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Display for RealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// A named text quantity; carries no unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextType {
    name: String,
}

impl TextType {
    pub fn new(name: &str) -> Result<Self> {
        validate_name(name)?;
        Ok(Self { name: name.to_string() })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

pub(crate) fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(UnitFieldError::malformed(format!("invalid type name '{name}'")))
    }
}

// ============================================================================
// Type Registry
// ============================================================================

#[derive(Debug, Default)]
struct RegistryState {
    reals: HashMap<String, RealType>,
    texts: HashMap<String, TextType>,
}

static GLOBAL_REGISTRY: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::new);

/// Name-indexed store of scalar types so that later lookups by name find
/// the same logical type.
///
/// Cloning shares the underlying table.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by name lookups and the type parser.
    pub fn global() -> TypeRegistry {
        GLOBAL_REGISTRY.clone()
    }

    /// Return the registered RealType called `name`, registering a new one
    /// if there is none.
    ///
    /// # Errors
    /// - `MalformedType` for an invalid name or a name already used by a
    ///   TextType
    /// - `IncompatibleUnitOperation` when the existing type's unit is not
    ///   convertible with `unit`
    pub fn get_or_create_real(
        &self,
        name: &str,
        unit: Option<Unit>,
        interval: bool,
    ) -> Result<RealType> {
        if let Some(existing) = self.state.read().reals.get(name) {
            return check_existing(existing, unit.as_ref());
        }
        let mut state = self.state.write();
        if state.texts.contains_key(name) {
            return Err(UnitFieldError::malformed(format!("'{name}' is a text type")));
        }
        if let Some(existing) = state.reals.get(name) {
            return check_existing(existing, unit.as_ref());
        }
        let created = RealType::new(name, unit, interval)?;
        debug!(name, unit = %unit_label(created.default_unit()), "registered real type");
        state.reals.insert(name.to_string(), created.clone());
        Ok(created)
    }

    /// Return the registered TextType called `name`, registering it if needed.
    pub fn get_or_create_text(&self, name: &str) -> Result<TextType> {
        let mut state = self.state.write();
        if state.reals.contains_key(name) {
            return Err(UnitFieldError::malformed(format!("'{name}' is a real type")));
        }
        if let Some(existing) = state.texts.get(name) {
            return Ok(existing.clone());
        }
        let created = TextType::new(name)?;
        state.texts.insert(name.to_string(), created.clone());
        Ok(created)
    }

    pub fn lookup_real(&self, name: &str) -> Option<RealType> {
        self.state.read().reals.get(name).cloned()
    }

    pub fn lookup_text(&self, name: &str) -> Option<TextType> {
        self.state.read().texts.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        let state = self.state.read();
        state.reals.contains_key(name) || state.texts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        let state = self.state.read();
        state.reals.len() + state.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_existing(existing: &RealType, unit: Option<&Unit>) -> Result<RealType> {
    let same = match (existing.default_unit(), unit) {
        (_, None) | (None, _) => true,
        (e, u) => can_convert(e, u),
    };
    if same {
        Ok(existing.clone())
    } else {
        Err(UnitFieldError::incompatible(format!(
            "{} is registered with unit {}, not {}",
            existing.name(),
            unit_label(existing.default_unit()),
            unit_label(unit)
        )))
    }
}

// ============================================================================
// Name Pool
// ============================================================================

/// Fresh-name source threaded through one expression-type computation.
///
/// Names are `Generic_<n>_<ext>` with the smallest `n >= 1` not yet handed
/// out by this pool, so a fresh pool always starts over and two evaluations
/// never interfere. Minted types land in the pool's registry.
#[derive(Debug)]
pub struct NamePool {
    used: HashSet<String>,
    registry: TypeRegistry,
}

impl NamePool {
    /// A pool registering into the global registry.
    pub fn new() -> Self {
        Self::with_registry(TypeRegistry::global())
    }

    pub fn with_registry(registry: TypeRegistry) -> Self {
        Self {
            used: HashSet::new(),
            registry,
        }
    }

    #[inline]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Names minted so far
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.used.iter().map(String::as_str)
    }

    /// Reserve the next unused name with the given extension.
    pub fn unique_name(&mut self, ext: &str) -> String {
        let ext: String = ext
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        let mut n = 1usize;
        loop {
            let candidate = format!("Generic_{n}_{ext}");
            if self.used.insert(candidate.clone()) {
                trace!(name = %candidate, "minted generic type name");
                return candidate;
            }
            n += 1;
        }
    }

    /// Mint a fresh RealType with `unit`, named after the unit.
    pub fn mint(&mut self, unit: Option<Unit>) -> Result<RealType> {
        self.mint_with(unit, false)
    }

    /// Mint a fresh RealType with `unit` and the given interval flag.
    ///
    /// A registered name whose interval flag differs is skipped.
    pub fn mint_with(&mut self, unit: Option<Unit>, interval: bool) -> Result<RealType> {
        let ext = match &unit {
            None => "nullUnit".to_string(),
            Some(u) if crate::units::catalog::is_degree(Some(u)) => "deg".to_string(),
            Some(u) => u.to_string(),
        };
        loop {
            let name = self.unique_name(&ext);
            let minted = self.registry.get_or_create_real(&name, unit.clone(), interval)?;
            if minted.is_interval() == interval {
                return Ok(minted);
            }
        }
    }
}

impl Default for NamePool {
    fn default() -> Self {
        Self::new()
    }
}

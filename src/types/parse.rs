// ============================================================================
// Type Strings
// Canonical pretty-printer for MathType and its left-inverse parser
// ============================================================================
//
// Grammar (whitespace is insignificant):
//
//     type     := set | paren | name
//     set      := ("Set" | "SET" | "set") paren
//     paren    := "(" type ( "->" type | ("," type)* ) ")"
//     name     := [A-Za-z][A-Za-z0-9_]*
//
// Unknown names become RealTypes without a unit.
// ============================================================================

use super::math_type::{FunctionType, MathType, RealTupleType, SetType};
use super::scalar::TypeRegistry;
use crate::error::{Result, UnitFieldError};
use std::fmt;

// ============================================================================
// Printer
// ============================================================================

fn write_components(
    f: &mut fmt::Formatter<'_>,
    parts: impl Iterator<Item = String>,
) -> fmt::Result {
    f.write_str("(")?;
    f.write_str(&parts.collect::<Vec<_>>().join(", "))?;
    f.write_str(")")
}

impl fmt::Display for RealTupleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_components(f, self.components().iter().map(|c| c.name().to_string()))
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let domain = self.domain();
        if domain.dimension() == 1 {
            write!(f, "({} -> {})", domain.components()[0], self.range())
        } else {
            write!(f, "({} -> {})", domain, self.range())
        }
    }
}

impl fmt::Display for SetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Set{}", self.domain())
    }
}

impl fmt::Display for MathType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MathType::Real(r) => write!(f, "{r}"),
            MathType::Text(t) => write!(f, "{t}"),
            MathType::RealTuple(t) => write!(f, "{t}"),
            MathType::Tuple(t) => write_components(f, t.components().iter().map(|c| c.to_string())),
            MathType::Function(func) => write!(f, "{func}"),
            MathType::Set(s) => write!(f, "{s}"),
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

impl MathType {
    /// Parse a type string, resolving names through the global registry.
    pub fn parse(text: &str) -> Result<MathType> {
        Self::parse_with(text, &TypeRegistry::global())
    }

    /// Parse a type string, resolving names through `registry`.
    ///
    /// # Errors
    /// `MalformedType` for anything outside the grammar.
    pub fn parse_with(text: &str, registry: &TypeRegistry) -> Result<MathType> {
        let compact: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
        let mut parser = Parser {
            chars: &compact,
            pos: 0,
            registry,
        };
        let parsed = parser.parse_type()?;
        if parser.pos != compact.len() {
            return Err(parser.error("trailing characters"));
        }
        Ok(parsed)
    }
}

struct Parser<'a> {
    chars: &'a [char],
    pos: usize,
    registry: &'a TypeRegistry,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn error(&self, what: &str) -> UnitFieldError {
        let text: String = self.chars.iter().collect();
        UnitFieldError::malformed(format!("{what} at position {} in '{text}'", self.pos))
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{c}'")))
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        let mut i = self.pos;
        for c in s.chars() {
            if self.chars.get(i) != Some(&c) {
                return false;
            }
            i += 1;
        }
        true
    }

    fn parse_type(&mut self) -> Result<MathType> {
        for prefix in ["Set(", "SET(", "set("] {
            if self.starts_with(prefix) {
                self.pos += 3;
                let domain = self.parse_paren()?;
                return MathType::set(domain);
            }
        }
        match self.peek() {
            Some('(') => self.parse_paren(),
            Some(c) if c.is_ascii_alphabetic() => self.parse_name(),
            _ => Err(self.error("expected a type")),
        }
    }

    fn parse_paren(&mut self) -> Result<MathType> {
        self.expect('(')?;
        let first = self.parse_type()?;
        if self.starts_with("->") {
            self.pos += 2;
            let range = self.parse_type()?;
            self.expect(')')?;
            return MathType::function(first, range);
        }
        let mut components = vec![first];
        while self.peek() == Some(',') {
            self.pos += 1;
            components.push(self.parse_type()?);
        }
        self.expect(')')?;
        MathType::tuple(components)
    }

    fn parse_name(&mut self) -> Result<MathType> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        if let Some(text) = self.registry.lookup_text(&name) {
            return Ok(MathType::Text(text));
        }
        Ok(MathType::Real(self.registry.get_or_create_real(&name, None, false)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::catalog;

    fn round_trip(text: &str, registry: &TypeRegistry) -> String {
        MathType::parse_with(text, registry).unwrap().to_string()
    }

    #[test]
    fn test_printer_is_canonical() {
        let registry = TypeRegistry::new();
        assert_eq!(round_trip("Temperature", &registry), "Temperature");
        assert_eq!(round_trip("( Latitude ,Longitude )", &registry), "(Latitude, Longitude)");
        assert_eq!(round_trip("(Time -> Temperature)", &registry), "(Time -> Temperature)");
        assert_eq!(
            round_trip("((Latitude, Longitude) -> (Temperature, Pressure))", &registry),
            "((Latitude, Longitude) -> (Temperature, Pressure))"
        );
        assert_eq!(round_trip("SET(Latitude, Longitude)", &registry), "Set(Latitude, Longitude)");
        assert_eq!(
            round_trip("(Time -> ((Lat, Lon) -> Rad))", &registry),
            "(Time -> ((Lat, Lon) -> Rad))"
        );
    }

    #[test]
    fn test_parse_is_left_inverse_of_print() {
        let registry = TypeRegistry::new();
        for text in [
            "X",
            "(X, Y)",
            "(X)",
            "(X -> Y)",
            "((X, Y) -> (Z, (T -> W)))",
            "Set(X, Y)",
            "((X, Y) -> ((A, B), C))",
        ] {
            let parsed = MathType::parse_with(text, &registry).unwrap();
            let again = MathType::parse_with(&parsed.to_string(), &registry).unwrap();
            assert_eq!(parsed, again, "{text}");
            assert_eq!(parsed.to_string(), again.to_string());
        }
    }

    #[test]
    fn test_parse_resolves_registered_units() {
        let registry = TypeRegistry::new();
        registry.get_or_create_real("Speed", Some(catalog::meter()), false).unwrap();
        let parsed = MathType::parse_with("(Time -> Speed)", &registry).unwrap();
        let range = parsed.as_function().unwrap().range().as_real().unwrap().clone();
        assert_eq!(range.default_unit(), Some(&catalog::meter()));
    }

    #[test]
    fn test_parse_errors() {
        let registry = TypeRegistry::new();
        let malformed = [
            "",
            "(X",
            "(X -> )",
            "X)",
            "1X",
            "(X, -> Y)",
            "((A -> B) -> C)",
            "Set(A -> B)",
        ];
        for bad in malformed {
            let parsed = MathType::parse_with(bad, &registry);
            assert!(matches!(parsed, Err(UnitFieldError::MalformedType(_))), "{bad}");
        }
    }

    #[test]
    fn test_set_prefix_requires_paren() {
        let registry = TypeRegistry::new();
        let parsed = MathType::parse_with("Settings", &registry).unwrap();
        assert!(matches!(parsed, MathType::Real(_)));
    }
}

//! Obligation formulas: an explicit tree over requirement atoms.
//!
//! Formulas are only ever built through the smart constructors ([`seq`],
//! [`choice`], [`optional`], [`repeat`]), which keep the tree in normal
//! form:
//!
//! - `Empty` never appears inside another node,
//! - sequences and choices are flat and have at least two members,
//! - choices carry no duplicate branches,
//! - a choice with an empty branch becomes an optional group,
//! - `(( x )?)?`, `(( x )?)*`, `(( x )*)?` and `(( x )*)*` collapse to a
//!   single group.
//!
//! [`Formula::simplify`] rebuilds an arbitrary tree through the same
//! constructors, so it is idempotent. Rendering is a separate pure pass
//! ([`fmt::Display`]); a choice inside an optional or repeated group shares
//! its parentheses, as in `( x || y )?`.
//!
//! [`seq`]: Formula::seq
//! [`choice`]: Formula::choice
//! [`optional`]: Formula::optional
//! [`repeat`]: Formula::repeat

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Formula {
    /// Contributes nothing.
    #[default]
    Empty,
    /// An unchecked requirement discharged by a call.
    Atom(String),
    /// `a ; b ; c`
    Seq(Vec<Formula>),
    /// `( a || b )`
    Choice(Vec<Formula>),
    /// `( a )?`
    Optional(Box<Formula>),
    /// `( a )*`
    Repeat(Box<Formula>),
}

impl Formula {
    pub fn atom(name: impl Into<String>) -> Self {
        Self::Atom(name.into())
    }

    /// Sequential composition; empty parts are dropped.
    pub fn seq<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Self::Empty => {}
                Self::Seq(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Self::Empty,
            1 => flat.pop().unwrap_or_default(),
            _ => Self::Seq(flat),
        }
    }

    /// Alternative composition. An empty branch makes the whole group
    /// optional.
    pub fn choice<I>(branches: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut flat: Vec<Self> = Vec::new();
        let mut may_skip = false;
        for branch in branches {
            let members = match branch {
                Self::Empty => {
                    may_skip = true;
                    continue;
                }
                Self::Choice(inner) => inner,
                other => vec![other],
            };
            for member in members {
                if !flat.contains(&member) {
                    flat.push(member);
                }
            }
        }
        let group = match flat.len() {
            0 => Self::Empty,
            1 => flat.pop().unwrap_or_default(),
            _ => Self::Choice(flat),
        };
        if may_skip {
            Self::optional(group)
        } else {
            group
        }
    }

    /// Zero or one occurrence.
    #[must_use]
    pub fn optional(inner: Self) -> Self {
        match inner {
            Self::Empty => Self::Empty,
            already @ (Self::Optional(_) | Self::Repeat(_)) => already,
            other => Self::Optional(Box::new(other)),
        }
    }

    /// Zero or more occurrences.
    #[must_use]
    pub fn repeat(inner: Self) -> Self {
        match inner {
            Self::Empty => Self::Empty,
            Self::Optional(body) => Self::Repeat(body),
            already @ Self::Repeat(_) => already,
            other => Self::Repeat(Box::new(other)),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Rebuild the tree in normal form.
    #[must_use]
    pub fn simplify(&self) -> Self {
        match self {
            Self::Empty => Self::Empty,
            Self::Atom(name) => Self::Atom(name.clone()),
            Self::Seq(parts) => Self::seq(parts.iter().map(Self::simplify)),
            Self::Choice(branches) => Self::choice(branches.iter().map(Self::simplify)),
            Self::Optional(inner) => Self::optional(inner.simplify()),
            Self::Repeat(inner) => Self::repeat(inner.simplify()),
        }
    }

    /// Atom names in order of first appearance.
    #[must_use]
    pub fn atoms(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_atoms(&mut out);
        out
    }

    fn collect_atoms<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Empty => {}
            Self::Atom(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Self::Seq(parts) | Self::Choice(parts) => {
                for part in parts {
                    part.collect_atoms(out);
                }
            }
            Self::Optional(inner) | Self::Repeat(inner) => inner.collect_atoms(out),
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Atom(name) => f.write_str(name),
            Self::Seq(parts) => write_joined(f, parts, " ; "),
            Self::Choice(_) => write_group(f, self, ""),
            Self::Optional(inner) => write_group(f, inner, "?"),
            Self::Repeat(inner) => write_group(f, inner, "*"),
        }
    }
}

/// `( body )` plus `suffix`; a choice body shares the group's parentheses.
fn write_group(f: &mut fmt::Formatter<'_>, body: &Formula, suffix: &str) -> fmt::Result {
    f.write_str("( ")?;
    match body {
        Formula::Choice(branches) => write_joined(f, branches, " || ")?,
        other => write!(f, "{other}")?,
    }
    write!(f, " ){suffix}")
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Formula], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn a(name: &str) -> Formula {
        Formula::atom(name)
    }

    #[test]
    fn renders_groups() {
        let f = Formula::seq([
            a("copy"),
            Formula::repeat(a("swap")),
            Formula::optional(Formula::choice([a("x"), a("y")])),
        ]);
        assert_eq!(f.to_string(), "copy ; ( swap )* ; ( x || y )?");
        assert_eq!(Formula::choice([a("x"), a("y")]).to_string(), "( x || y )");
    }

    #[test]
    fn empty_parts_vanish() {
        assert!(Formula::seq([Formula::Empty, Formula::Empty]).is_empty());
        assert!(Formula::repeat(Formula::seq([])).is_empty());
        assert!(Formula::optional(Formula::Empty).is_empty());
        assert_eq!(Formula::seq([Formula::Empty, a("x")]), a("x"));
    }

    #[test]
    fn empty_branch_makes_choice_optional() {
        assert_eq!(
            Formula::choice([a("x"), Formula::Empty]).to_string(),
            "( x )?"
        );
        assert_eq!(
            Formula::choice([Formula::Empty, a("x"), a("y")]).to_string(),
            "( x || y )?"
        );
        assert!(Formula::choice([Formula::Empty, Formula::Empty]).is_empty());
    }

    #[test]
    fn nested_groups_collapse() {
        let x = || a("x");
        assert_eq!(Formula::repeat(Formula::optional(x())).to_string(), "( x )*");
        assert_eq!(Formula::optional(Formula::repeat(x())).to_string(), "( x )*");
        assert_eq!(Formula::optional(Formula::optional(x())).to_string(), "( x )?");
        assert_eq!(Formula::repeat(Formula::repeat(x())).to_string(), "( x )*");
    }

    #[test]
    fn flattening_and_duplicate_branches() {
        let nested = Formula::Seq(vec![
            a("a"),
            Formula::Seq(vec![a("b"), Formula::Seq(vec![a("c")])]),
        ]);
        assert_eq!(nested.simplify().to_string(), "a ; b ; c");

        let choices = Formula::Choice(vec![
            a("x"),
            Formula::Choice(vec![a("y"), a("x")]),
            a("y"),
        ]);
        assert_eq!(choices.simplify().to_string(), "( x || y )");
        assert_eq!(Formula::choice([a("x"), a("x")]), a("x"));
    }

    #[test]
    fn atoms_in_first_appearance_order() {
        let f = Formula::seq([a("b"), Formula::repeat(Formula::choice([a("a"), a("b")]))]);
        assert_eq!(f.atoms(), vec!["b", "a"]);
    }

    fn arb_formula() -> impl Strategy<Value = Formula> {
        let leaf = prop_oneof![Just(Formula::Empty), "[a-d]".prop_map(Formula::Atom)];
        leaf.prop_recursive(4, 48, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Formula::Seq),
                prop::collection::vec(inner.clone(), 0..4).prop_map(Formula::Choice),
                inner.clone().prop_map(|f| Formula::Optional(Box::new(f))),
                inner.prop_map(|f| Formula::Repeat(Box::new(f))),
            ]
        })
    }

    proptest! {
        #[test]
        fn simplify_is_idempotent(f in arb_formula()) {
            let once = f.simplify();
            let twice = once.simplify();
            prop_assert_eq!(once.to_string(), twice.to_string());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn simplify_keeps_atoms(f in arb_formula()) {
            let before: Vec<String> = f.atoms().into_iter().map(str::to_owned).collect();
            let simplified = f.simplify();
            let mut after: Vec<&str> = simplified.atoms();
            let mut expected: Vec<&str> = before.iter().map(String::as_str).collect();
            after.sort_unstable();
            expected.sort_unstable();
            prop_assert_eq!(after, expected);
        }
    }
}

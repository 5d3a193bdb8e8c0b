//! core::target
//!
//! Target tags and compatibility grading.
//!
//! # Model
//!
//! A [`Target`] is a set of tags drawn from a closed vocabulary:
//! platform families (`web`, `jre`), runtime variants (`openfx`,
//! `native`, which refine `jre`) and form factors (`desktop`,
//! `mobile`). Executable modules carry the target they are built for;
//! other modules carry the targets they are designed to run on.
//!
//! # Grading
//!
//! [`Target::grade`] scores a candidate module's tag set against an
//! executable's required tag set. A non-negative grade means the
//! candidate can serve the executable; higher grades mean a tighter
//! fit. The grade drives provider selection and interface resolution
//! tie-breaks, so it must be total and deterministic.
//!
//! # Invariants
//!
//! - An untagged candidate is universal: it grades 0 against anything.
//! - A candidate positioned on an unrelated tag is incompatible (−1).
//! - Grading is a pure function of the two tag sets.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::TypeError;

/// A single target tag from the closed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetTag {
    /// Browser platform (transpiled sources).
    Web,
    /// Desktop/server JVM platform.
    Jre,
    /// Desktop JVM UI runtime; refines [`TargetTag::Jre`].
    OpenFx,
    /// Native-image mobile runtime; refines [`TargetTag::Jre`].
    Native,
    /// Desktop form factor.
    Desktop,
    /// Mobile form factor.
    Mobile,
}

impl TargetTag {
    /// Parse a single tag.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        match s.trim() {
            "web" => Ok(TargetTag::Web),
            "jre" => Ok(TargetTag::Jre),
            "openfx" => Ok(TargetTag::OpenFx),
            "native" => Ok(TargetTag::Native),
            "desktop" => Ok(TargetTag::Desktop),
            "mobile" => Ok(TargetTag::Mobile),
            other => Err(TypeError::InvalidTargetTag(other.to_string())),
        }
    }

    /// The tag's canonical spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            TargetTag::Web => "web",
            TargetTag::Jre => "jre",
            TargetTag::OpenFx => "openfx",
            TargetTag::Native => "native",
            TargetTag::Desktop => "desktop",
            TargetTag::Mobile => "mobile",
        }
    }

    /// The broader tag this one refines, if any.
    ///
    /// `openfx` and `native` executables run on JVM technology, so a
    /// module tagged `jre` can serve them.
    pub fn refines(self) -> Option<TargetTag> {
        match self {
            TargetTag::OpenFx | TargetTag::Native => Some(TargetTag::Jre),
            _ => None,
        }
    }

    /// Whether two tags sit on the same refinement chain.
    fn related(self, other: TargetTag) -> bool {
        self == other || self.refines() == Some(other) || other.refines() == Some(self)
    }
}

impl fmt::Display for TargetTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered, duplicate-free set of target tags.
///
/// # Example
///
/// ```
/// use weft::core::target::Target;
///
/// let required = Target::parse("web").unwrap();
/// let dedicated = Target::parse("web").unwrap();
/// let shared = Target::parse("web,desktop").unwrap();
/// let foreign = Target::parse("desktop").unwrap();
///
/// assert_eq!(dedicated.grade(&required), 3);
/// assert_eq!(shared.grade(&required), 2);
/// assert_eq!(foreign.grade(&required), -1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    tags: Vec<TargetTag>,
}

impl Target {
    /// An empty (universal) target.
    pub fn untagged() -> Self {
        Self::default()
    }

    /// Build a target from tags, keeping first occurrences in order.
    pub fn new(tags: impl IntoIterator<Item = TargetTag>) -> Self {
        let mut out = Vec::new();
        for tag in tags {
            if !out.contains(&tag) {
                out.push(tag);
            }
        }
        Self { tags: out }
    }

    /// Parse a comma-separated tag list, e.g. `"jre,openfx"`.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let mut tags = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            tags.push(TargetTag::parse(part)?);
        }
        Ok(Self::new(tags))
    }

    /// The tags in declaration order.
    pub fn tags(&self) -> &[TargetTag] {
        &self.tags
    }

    pub fn is_untagged(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn has_tag(&self, tag: TargetTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Grade this target (as a candidate) against a required target.
    ///
    /// Returns −1 when the candidate cannot serve the required target,
    /// otherwise a non-negative score where higher means tighter:
    ///
    /// - each required tag the candidate carries exactly scores 2;
    /// - each required tag the candidate only covers through the
    ///   refinement chain scores 1;
    /// - a required tag the candidate neither carries nor covers makes
    ///   the whole candidate incompatible;
    /// - an untagged candidate is universal and scores 0;
    /// - a candidate dedicated to a single tag earns a +1 bonus.
    pub fn grade(&self, required: &Target) -> i32 {
        if self.tags.is_empty() {
            return 0;
        }
        let mut grade = 0;
        for &req in &required.tags {
            let best = self
                .tags
                .iter()
                .map(|&c| {
                    if c == req {
                        2
                    } else if c.related(req) {
                        1
                    } else {
                        -1
                    }
                })
                .max()
                .unwrap_or(-1);
            if best < 0 {
                return -1;
            }
            grade += best;
        }
        if self.tags.len() == 1 {
            grade += 1;
        }
        grade
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for tag in &self.tags {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            f.write_str(tag.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Target {
        Target::parse(s).unwrap()
    }

    #[test]
    fn parse_roundtrip() {
        assert_eq!(t("jre,openfx").to_string(), "jre,openfx");
        assert_eq!(t("web").to_string(), "web");
        assert_eq!(t("").to_string(), "");
    }

    #[test]
    fn parse_dedupes_preserving_order() {
        assert_eq!(t("web,jre,web").to_string(), "web,jre");
    }

    #[test]
    fn unknown_tag_rejected() {
        assert!(Target::parse("web,plan9").is_err());
    }

    #[test]
    fn untagged_is_universal() {
        assert_eq!(Target::untagged().grade(&t("web")), 0);
        assert_eq!(Target::untagged().grade(&t("jre,openfx")), 0);
    }

    #[test]
    fn dedicated_beats_shared() {
        // A web-only module fits a web executable tighter than a
        // module shipped for both web and desktop.
        assert_eq!(t("web").grade(&t("web")), 3);
        assert_eq!(t("web,desktop").grade(&t("web")), 2);
    }

    #[test]
    fn foreign_platform_is_incompatible() {
        assert_eq!(t("desktop").grade(&t("web")), -1);
        assert_eq!(t("web").grade(&t("jre")), -1);
        assert_eq!(t("jre").grade(&t("web")), -1);
    }

    #[test]
    fn refinement_chain_covers() {
        // A plain-JVM module can serve an OpenFX desktop executable.
        assert!(t("jre").grade(&t("jre,openfx")) >= 0);
        // And the dedicated OpenFX module grades higher on an OpenFX point.
        assert!(t("openfx").grade(&t("openfx")) > t("jre").grade(&t("openfx")));
    }

    #[test]
    fn specific_candidate_on_generic_requirement() {
        assert!(t("openfx").grade(&t("jre")) >= 0);
        assert!(t("native").grade(&t("jre")) >= 0);
    }

    #[test]
    fn grade_is_deterministic() {
        let candidate = t("web,desktop");
        let required = t("web");
        assert_eq!(candidate.grade(&required), candidate.grade(&required));
    }
}

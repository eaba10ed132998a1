//! The four native libraries the solver stack is built from.
//!
//! Order matters: each library links against the static archives installed
//! by the ones before it, so `Dependency::ordered()` is the only sequence the
//! pipeline ever walks.

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// A library fetched and installed by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Display, EnumString, EnumIter)]
pub enum Dependency {
    /// Karypis lab utility library, required by METIS and ParMETIS
    #[strum(serialize = "GKlib")]
    Gklib,
    /// Serial graph partitioning
    #[strum(serialize = "METIS")]
    Metis,
    /// MPI-parallel graph partitioning
    #[strum(serialize = "ParMETIS")]
    Parmetis,
    /// Distributed sparse direct solver
    #[strum(serialize = "superlu_dist")]
    SuperluDist,
}

impl Dependency {
    /// All dependencies, leaves first.
    pub fn ordered() -> Vec<Self> {
        Self::iter().collect()
    }

    /// Directory the repository is cloned into (named after the repository).
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Gklib => "GKlib",
            Self::Metis => "METIS",
            Self::Parmetis => "ParMETIS",
            Self::SuperluDist => "superlu_dist",
        }
    }

    /// Upstream git repository.
    pub const fn repository(self) -> &'static str {
        match self {
            Self::Gklib => "https://github.com/KarypisLab/GKlib.git",
            Self::Metis => "https://github.com/KarypisLab/METIS.git",
            Self::Parmetis => "https://github.com/KarypisLab/ParMETIS.git",
            Self::SuperluDist => "https://github.com/xiaoyeli/superlu_dist.git",
        }
    }

    /// Static archive installed under `<prefix>/lib`, if the library produces one
    /// that a later build links against.
    pub const fn static_archive(self) -> Option<&'static str> {
        match self {
            Self::Gklib => Some("libGKlib.a"),
            Self::Metis => Some("libmetis.a"),
            Self::Parmetis => Some("libparmetis.a"),
            Self::SuperluDist => None,
        }
    }

    /// Whether the library uses `make config` (as opposed to a cmake build tree).
    pub const fn uses_make_config(self) -> bool {
        !matches!(self, Self::SuperluDist)
    }

    /// Whether `make config` needs an explicit C compiler (the MPI wrapper).
    pub const fn needs_compiler(self) -> bool {
        matches!(self, Self::Parmetis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_leaves_first() {
        assert_eq!(
            Dependency::ordered(),
            vec![
                Dependency::Gklib,
                Dependency::Metis,
                Dependency::Parmetis,
                Dependency::SuperluDist
            ]
        );
    }

    #[test]
    fn test_display_matches_dir_name() {
        for dep in Dependency::iter() {
            assert_eq!(dep.to_string(), dep.dir_name());
        }
    }

    #[test]
    fn test_parse_from_display_name() {
        let dep: Dependency = "ParMETIS".parse().unwrap();
        assert_eq!(dep, Dependency::Parmetis);
        assert!("parmetis-4".parse::<Dependency>().is_err());
    }

    #[test]
    fn test_repository_ends_with_dir_name() {
        for dep in Dependency::iter() {
            let expected = format!("/{}.git", dep.dir_name());
            assert!(dep.repository().ends_with(&expected), "{}", dep.repository());
        }
    }

    #[test]
    fn test_only_parmetis_needs_compiler() {
        let needing: Vec<_> = Dependency::iter().filter(|d| d.needs_compiler()).collect();
        assert_eq!(needing, vec![Dependency::Parmetis]);
        assert!(!Dependency::SuperluDist.uses_make_config());
    }
}

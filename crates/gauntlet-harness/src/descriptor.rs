//! Configuration descriptors
//!
//! A descriptor picks exactly one point of the test matrix. Structural
//! compatibility of its axes is checked here; whether a subject exists for
//! it is the adapter's business.

use crate::axis::{ApiMode, FrontendKind, ModuleKind, SessionMode};
use crate::error::{HarnessError, HarnessResult};
use gauntlet_config::DescriptorSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One point of the configuration matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConfigurationDescriptor {
    frontend: FrontendKind,
    module_kind: ModuleKind,
    session_mode: SessionMode,
    api_mode: ApiMode,
}

impl ConfigurationDescriptor {
    pub fn new(
        frontend: FrontendKind,
        module_kind: ModuleKind,
        session_mode: SessionMode,
        api_mode: ApiMode,
    ) -> Self {
        Self {
            frontend,
            module_kind,
            session_mode,
            api_mode,
        }
    }

    /// Parse a descriptor from its configuration-file form
    pub fn from_spec(spec: &DescriptorSpec) -> HarnessResult<Self> {
        Ok(Self::new(
            spec.frontend.parse()?,
            spec.module_kind.parse()?,
            spec.session_mode.parse()?,
            spec.api_mode.parse()?,
        ))
    }

    pub fn frontend(&self) -> FrontendKind {
        self.frontend
    }

    pub fn module_kind(&self) -> ModuleKind {
        self.module_kind
    }

    pub fn session_mode(&self) -> SessionMode {
        self.session_mode
    }

    pub fn api_mode(&self) -> ApiMode {
        self.api_mode
    }

    /// Check that the axes can be combined at all.
    ///
    /// Returns the reason when they cannot.
    pub fn check_compatibility(&self) -> Result<(), String> {
        if self.frontend == FrontendKind::Fe10 {
            if self.session_mode != SessionMode::Normal {
                return Err(format!(
                    "frontend {} supports only the normal session mode",
                    self.frontend
                ));
            }
            if self.api_mode != ApiMode::Ide {
                return Err(format!(
                    "frontend {} supports only the ide API mode",
                    self.frontend
                ));
            }
        }

        if self.session_mode == SessionMode::Dependent
            && !matches!(self.module_kind, ModuleKind::Source | ModuleKind::Script)
        {
            return Err(format!(
                "dependent sessions require a source or script module, not {}",
                self.module_kind
            ));
        }

        if self.api_mode == ApiMode::Standalone
            && matches!(
                self.module_kind,
                ModuleKind::CodeFragment | ModuleKind::NotUnderContentRoot
            )
        {
            return Err(format!(
                "standalone mode cannot analyze {} modules",
                self.module_kind
            ));
        }

        Ok(())
    }

    /// Whether the axes form a structurally valid combination
    pub fn is_compatible(&self) -> bool {
        self.check_compatibility().is_ok()
    }

    /// Name of this configuration point, e.g. `FirIdeNormalAnalysisLibraryBinaryModule`
    pub fn configuration_name(&self) -> String {
        format!(
            "{}{}{}Analysis{}",
            self.frontend.camel_name(),
            self.api_mode.camel_name(),
            self.session_mode.camel_name(),
            self.module_kind.camel_name()
        )
    }

    /// Every point of the matrix, valid or not, in axis order
    pub fn matrix() -> impl Iterator<Item = ConfigurationDescriptor> {
        FrontendKind::ALL.iter().flat_map(|&frontend| {
            ModuleKind::ALL.iter().flat_map(move |&module_kind| {
                SessionMode::ALL.iter().flat_map(move |&session_mode| {
                    ApiMode::ALL.iter().map(move |&api_mode| {
                        ConfigurationDescriptor::new(frontend, module_kind, session_mode, api_mode)
                    })
                })
            })
        })
    }
}

impl fmt::Display for ConfigurationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.frontend, self.module_kind, self.session_mode, self.api_mode
        )
    }
}

/// Parses the display form, `frontend/module-kind/session-mode/api-mode`
impl FromStr for ConfigurationDescriptor {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        let &[frontend, module_kind, session_mode, api_mode] = parts.as_slice() else {
            return Err(HarnessError::InvalidAxisValue {
                axis: "descriptor",
                value: s.to_string(),
                expected: "frontend/module-kind/session-mode/api-mode".to_string(),
            });
        };
        Ok(Self::new(
            frontend.parse()?,
            module_kind.parse()?,
            session_mode.parse()?,
            api_mode.parse()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn descriptor(
        frontend: FrontendKind,
        module_kind: ModuleKind,
        session_mode: SessionMode,
        api_mode: ApiMode,
    ) -> ConfigurationDescriptor {
        ConfigurationDescriptor::new(frontend, module_kind, session_mode, api_mode)
    }

    #[test]
    fn test_configuration_name() {
        let d = descriptor(
            FrontendKind::Fir,
            ModuleKind::LibraryBinary,
            SessionMode::Normal,
            ApiMode::Ide,
        );
        assert_eq!(
            d.configuration_name(),
            "FirIdeNormalAnalysisLibraryBinaryModule"
        );
        assert_eq!(d.to_string(), "fir/library-binary/normal/ide");
    }

    #[test]
    fn test_parse_display_form() {
        for d in ConfigurationDescriptor::matrix() {
            assert_eq!(d.to_string().parse::<ConfigurationDescriptor>().unwrap(), d);
        }
        assert!("fir/source/normal".parse::<ConfigurationDescriptor>().is_err());
        assert!("fir/source/normal/ide/extra"
            .parse::<ConfigurationDescriptor>()
            .is_err());
    }

    #[test]
    fn test_from_spec() {
        let spec = DescriptorSpec {
            frontend: "fir".to_string(),
            module_kind: "script".to_string(),
            session_mode: "dependent".to_string(),
            api_mode: "standalone".to_string(),
        };
        let d = ConfigurationDescriptor::from_spec(&spec).unwrap();
        assert_eq!(d.module_kind(), ModuleKind::Script);
        assert_eq!(d.session_mode(), SessionMode::Dependent);
    }

    #[test]
    fn test_from_spec_rejects_unknown_axis_value() {
        let spec = DescriptorSpec {
            frontend: "k2".to_string(),
            module_kind: "source".to_string(),
            session_mode: "normal".to_string(),
            api_mode: "ide".to_string(),
        };
        assert!(ConfigurationDescriptor::from_spec(&spec).is_err());
    }

    #[rstest]
    #[case(FrontendKind::Fe10, ModuleKind::Source, SessionMode::Dependent, ApiMode::Ide)]
    #[case(FrontendKind::Fe10, ModuleKind::Source, SessionMode::Normal, ApiMode::Standalone)]
    #[case(FrontendKind::Fir, ModuleKind::LibraryBinary, SessionMode::Dependent, ApiMode::Ide)]
    #[case(FrontendKind::Fir, ModuleKind::CodeFragment, SessionMode::Normal, ApiMode::Standalone)]
    fn test_incompatible_combinations(
        #[case] frontend: FrontendKind,
        #[case] module_kind: ModuleKind,
        #[case] session_mode: SessionMode,
        #[case] api_mode: ApiMode,
    ) {
        let d = descriptor(frontend, module_kind, session_mode, api_mode);
        assert!(!d.is_compatible(), "{d} should be incompatible");
    }

    #[rstest]
    #[case(FrontendKind::Fir, ModuleKind::LibraryBinary, SessionMode::Normal, ApiMode::Ide)]
    #[case(FrontendKind::Fir, ModuleKind::Script, SessionMode::Dependent, ApiMode::Standalone)]
    #[case(FrontendKind::Fe10, ModuleKind::LibrarySource, SessionMode::Normal, ApiMode::Ide)]
    fn test_compatible_combinations(
        #[case] frontend: FrontendKind,
        #[case] module_kind: ModuleKind,
        #[case] session_mode: SessionMode,
        #[case] api_mode: ApiMode,
    ) {
        assert!(descriptor(frontend, module_kind, session_mode, api_mode).is_compatible());
    }

    #[test]
    fn test_matrix_covers_every_combination_once() {
        let all: Vec<_> = ConfigurationDescriptor::matrix().collect();
        assert_eq!(all.len(), 2 * 6 * 2 * 2);

        let mut sorted = all.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), all.len());
    }

    #[test]
    fn test_configuration_names_are_unique() {
        let mut names: Vec<_> = ConfigurationDescriptor::matrix()
            .map(|d| d.configuration_name())
            .collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}

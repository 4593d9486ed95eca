//! Expectation holder with atomic matcher replacement.
//!
//! Readers take a cheap `Arc` clone of the current [`CompiledMatcher`] and
//! release the lock before matching, so an in-flight match always runs
//! against one consistent snapshot. [`Expectation::update`] builds the
//! replacement outside the lock and swaps it in only on success.

use crate::config::MatcherConfig;
use crate::error::SpecError;
use crate::matcher::{HttpRequestMatcher, MatchDifference};
use crate::model::{HttpRequest, RequestDefinition};
use crate::openapi::OpenApiMatcher;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

/// A compiled request definition.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledMatcher {
    Http(HttpRequestMatcher),
    OpenApi(OpenApiMatcher),
}

impl CompiledMatcher {
    pub fn compile(
        definition: &RequestDefinition,
        config: Arc<MatcherConfig>,
        control_plane: bool,
    ) -> Result<Self, SpecError> {
        Ok(match definition {
            RequestDefinition::Http(request) => CompiledMatcher::Http(
                HttpRequestMatcher::compile(request, config).with_control_plane(control_plane),
            ),
            RequestDefinition::OpenApi(definition) => CompiledMatcher::OpenApi(
                OpenApiMatcher::compile(definition, config)?.with_control_plane(control_plane),
            ),
        })
    }

    pub fn matches(
        &self,
        difference: Option<&mut MatchDifference>,
        definition: &RequestDefinition,
    ) -> bool {
        match self {
            CompiledMatcher::Http(matcher) => matcher.matches(difference, definition),
            CompiledMatcher::OpenApi(matcher) => matcher.matches(difference, definition),
        }
    }

    pub fn matches_in(
        &self,
        difference: Option<&mut MatchDifference>,
        control_plane: bool,
        definition: &RequestDefinition,
    ) -> bool {
        match self {
            CompiledMatcher::Http(matcher) => matcher.matches_in(difference, control_plane, definition),
            CompiledMatcher::OpenApi(matcher) => {
                matcher.matches_in(difference, control_plane, definition)
            }
        }
    }
}

/// Immutable state published by an [`Expectation`].
#[derive(Debug)]
pub struct Snapshot {
    pub definition: RequestDefinition,
    pub matcher: CompiledMatcher,
}

/// A request definition whose compiled matcher can be replaced while
/// other threads are matching against it.
#[derive(Debug)]
pub struct Expectation {
    config: Arc<MatcherConfig>,
    control_plane: bool,
    current: RwLock<Arc<Snapshot>>,
}

impl Expectation {
    pub fn new(definition: RequestDefinition, config: MatcherConfig) -> Result<Self, SpecError> {
        Self::build(definition, Arc::new(config), false)
    }

    /// An expectation that compares request patterns with each other.
    pub fn control_plane(
        definition: RequestDefinition,
        config: MatcherConfig,
    ) -> Result<Self, SpecError> {
        Self::build(definition, Arc::new(config), true)
    }

    fn build(
        definition: RequestDefinition,
        config: Arc<MatcherConfig>,
        control_plane: bool,
    ) -> Result<Self, SpecError> {
        let matcher = CompiledMatcher::compile(&definition, config.clone(), control_plane)?;
        debug!("Created request matcher for {}", describe(&definition));
        Ok(Self {
            config,
            control_plane,
            current: RwLock::new(Arc::new(Snapshot {
                definition,
                matcher,
            })),
        })
    }

    /// Replace the definition.
    ///
    /// Returns `Ok(false)` when `definition` equals the current one. On error
    /// the current matcher stays in place.
    pub fn update(&self, definition: RequestDefinition) -> Result<bool, SpecError> {
        if self.snapshot().definition == definition {
            return Ok(false);
        }
        let matcher = CompiledMatcher::compile(&definition, self.config.clone(), self.control_plane)?;
        let description = describe(&definition);
        *self.current.write() = Arc::new(Snapshot {
            definition,
            matcher,
        });
        info!("Updated request matcher for {}", description);
        Ok(true)
    }

    /// The currently published state.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn definition(&self) -> RequestDefinition {
        self.snapshot().definition.clone()
    }

    pub fn is_control_plane(&self) -> bool {
        self.control_plane
    }

    pub fn matches(
        &self,
        difference: Option<&mut MatchDifference>,
        definition: &RequestDefinition,
    ) -> bool {
        self.snapshot().matcher.matches(difference, definition)
    }

    /// Match without collecting differences.
    pub fn matches_request(&self, request: &HttpRequest) -> bool {
        self.snapshot()
            .matcher
            .matches(None, &RequestDefinition::Http(request.clone()))
    }
}

fn describe(definition: &RequestDefinition) -> String {
    serde_json::to_string(definition).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OpenApiDefinition;
    use std::thread;

    #[test]
    fn test_update_replaces_matcher() {
        let expectation = Expectation::new(
            HttpRequest::new().with_path("/a").into(),
            MatcherConfig::default(),
        )
        .unwrap();
        assert!(expectation.matches_request(&HttpRequest::new().with_path("/a")));

        assert!(expectation.update(HttpRequest::new().with_path("/b").into()).unwrap());
        assert!(!expectation.matches_request(&HttpRequest::new().with_path("/a")));
        assert!(expectation.matches_request(&HttpRequest::new().with_path("/b")));
    }

    #[test]
    fn test_update_with_same_definition_is_noop() {
        let definition: RequestDefinition = HttpRequest::new().with_method("GET").into();
        let expectation = Expectation::new(definition.clone(), MatcherConfig::default()).unwrap();
        let before = expectation.snapshot();
        assert!(!expectation.update(definition).unwrap());
        assert!(Arc::ptr_eq(&before, &expectation.snapshot()));
    }

    #[test]
    fn test_failed_update_keeps_previous_matcher() {
        let expectation = Expectation::new(
            HttpRequest::new().with_path("/a").into(),
            MatcherConfig::default(),
        )
        .unwrap();
        let error = expectation
            .update(OpenApiDefinition::new(r#"{"swagger": "2.0"}"#).into())
            .unwrap_err();
        assert!(error.to_string().starts_with("Unable to load API spec, "));
        assert!(expectation.matches_request(&HttpRequest::new().with_path("/a")));
        assert!(matches!(expectation.definition(), RequestDefinition::Http(_)));
    }

    #[test]
    fn test_control_plane_expectation() {
        let expectation = Expectation::control_plane(
            HttpRequest::new().with_path(crate::model::Pattern::regex("/a/.*")).into(),
            MatcherConfig::default(),
        )
        .unwrap();
        assert!(expectation.is_control_plane());
        assert!(expectation.matches(
            None,
            &HttpRequest::new().with_path(crate::model::Pattern::regex("/a/.*")).into()
        ));
    }

    #[test]
    fn test_readers_see_whole_snapshots() {
        let expectation = Arc::new(
            Expectation::new(
                HttpRequest::new().with_method("GET").with_path("/a").into(),
                MatcherConfig::default(),
            )
            .unwrap(),
        );

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let expectation = Arc::clone(&expectation);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let a = HttpRequest::new().with_method("GET").with_path("/a");
                        let b = HttpRequest::new().with_method("POST").with_path("/b");
                        let snapshot = expectation.snapshot();
                        let definition_a = RequestDefinition::Http(a);
                        let definition_b = RequestDefinition::Http(b);
                        // Exactly one of the two published definitions matches.
                        assert_ne!(
                            snapshot.matcher.matches(None, &definition_a),
                            snapshot.matcher.matches(None, &definition_b)
                        );
                    }
                })
            })
            .collect();

        for i in 0..200 {
            let definition = if i % 2 == 0 {
                HttpRequest::new().with_method("POST").with_path("/b")
            } else {
                HttpRequest::new().with_method("GET").with_path("/a")
            };
            expectation.update(definition.into()).unwrap();
        }
        for reader in readers {
            reader.join().unwrap();
        }
    }
}

//! Fixtures shared by the routing benchmarks.

/// A named route fixture.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    fixture: RouteFixture,
}

impl TestCase {
    pub const fn new(name: &'static str, fixture: RouteFixture) -> Self {
        Self { name, fixture }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fixture(&self) -> &RouteFixture {
        &self.fixture
    }

    /// `<depth>/<name>`, so reports sort shallow paths first
    pub fn id(&self) -> String {
        format!("{}/{}", self.fixture.depth(), self.name)
    }
}

/// A route template, a request path and the params the path is expected to capture.
///
/// `expected` is `None` when the path must not match.
#[derive(Debug, Copy, Clone)]
pub struct RouteFixture {
    template: &'static str,
    path: &'static str,
    expected: Option<&'static [(&'static str, &'static str)]>,
}

impl RouteFixture {
    pub const fn hit(
        template: &'static str,
        path: &'static str,
        params: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { template, path, expected: Some(params) }
    }

    pub const fn miss(template: &'static str, path: &'static str) -> Self {
        Self { template, path, expected: None }
    }

    pub fn template(&self) -> &'static str {
        self.template
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn should_match(&self) -> bool {
        self.expected.is_some()
    }

    /// Number of non-empty segments in the request path
    pub fn depth(&self) -> usize {
        self.path.split('/').filter(|segment| !segment.is_empty()).count()
    }

    /// Compares what a matcher captured for `path` with the expectation.
    pub fn verify<'a, I>(&self, captured: Option<I>) -> Result<(), String>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        match (self.expected, captured) {
            (None, None) => Ok(()),
            (None, Some(_)) => Err(format!("'{}' should not match '{}'", self.template, self.path)),
            (Some(_), None) => Err(format!("'{}' should match '{}'", self.template, self.path)),
            (Some(expected), Some(captured)) => {
                let captured: Vec<_> = captured.into_iter().collect();
                if captured == expected {
                    Ok(())
                } else {
                    let (template, path) = (self.template, self.path);
                    Err(format!("'{template}' captured {captured:?} from '{path}', expected {expected:?}"))
                }
            }
        }
    }
}

/// A routing benchmark input: a route table and the path requested against it.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    table: RouteTable,
    path: &'static str,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, table: RouteTable, path: &'static str) -> Self {
        Self { name, group, table, path }
    }

    pub fn small(name: &'static str, table: RouteTable, path: &'static str) -> Self {
        Self::new(name, TestGroup::Small, table, path)
    }

    pub fn normal(name: &'static str, table: RouteTable, path: &'static str) -> Self {
        Self::new(name, TestGroup::Normal, table, path)
    }

    pub fn large(name: &'static str, table: RouteTable, path: &'static str) -> Self {
        Self::new(name, TestGroup::Large, table, path)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn path(&self) -> &'static str {
        self.path
    }
}

/// Route patterns sharing one base pattern, in registration order.
#[derive(Debug, Copy, Clone)]
pub struct RouteTable {
    base_pattern: &'static str,
    patterns: &'static [&'static str],
}

impl RouteTable {
    pub const fn new(base_pattern: &'static str, patterns: &'static [&'static str]) -> Self {
        Self { base_pattern, patterns }
    }

    pub fn base_pattern(&self) -> &'static str {
        self.base_pattern
    }

    pub fn patterns(&self) -> &'static [&'static str] {
        self.patterns
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}

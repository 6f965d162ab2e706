//! Built-in import-graph analysis used for circular-dependency checks.
//!
//! Modules are the source files under the source root. Edges come from
//! relative `import`/`export ... from`/`import()`/`require()` specifiers;
//! bare package imports are outside the graph.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::Result;
use crate::paths;

const SKIP_DIRS: &[&str] = &["node_modules", "dist", "build", "coverage"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl ImportGraph {
    /// Scan every file under `source_root` with one of `extensions`.
    /// A missing source root gives an empty graph.
    pub fn build(source_root: &Path, extensions: &[String]) -> Result<Self> {
        let mut files = Vec::new();
        if source_root.is_dir() {
            collect_sources(source_root, extensions, &mut files)?;
        }
        files.sort();
        let known: HashSet<PathBuf> = files.iter().cloned().collect();

        let mut graph = ImportGraph::default();
        for file in &files {
            let name = module_name(source_root, file);
            let text = std::fs::read_to_string(file)?;
            let deps = graph.edges.entry(name).or_default();
            for spec in extract_specifiers(&text) {
                if let Some(target) = resolve_specifier(file, &spec, &known) {
                    deps.insert(module_name(source_root, &target));
                }
            }
        }
        Ok(graph)
    }

    pub fn from_edges<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut graph = ImportGraph::default();
        for (from, to) in pairs {
            graph.edges.entry(to.to_string()).or_default();
            graph
                .edges
                .entry(from.to_string())
                .or_default()
                .insert(to.to_string());
        }
        graph
    }

    pub fn module_count(&self) -> usize {
        self.edges.len()
    }

    pub fn dependencies(&self, module: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(module)
    }

    /// Every elementary cycle in the graph.
    ///
    /// Strongly connected components are found first; cycles are then
    /// enumerated inside each non-trivial component (Johnson's algorithm).
    /// Each cycle starts at its smallest module name. Output is sorted and
    /// stops growing at [`MAX_CYCLES`].
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let names: Vec<&str> = self.edges.keys().map(String::as_str).collect();
        let index: HashMap<&str, usize> = names.iter().enumerate().map(|(i, n)| (*n, i)).collect();
        let adj: Vec<Vec<usize>> = self
            .edges
            .values()
            .map(|deps| deps.iter().filter_map(|d| index.get(d.as_str()).copied()).collect())
            .collect();

        let component = strongly_connected(&adj);
        let mut size = vec![0usize; names.len()];
        for c in &component {
            size[*c] += 1;
        }

        let mut cycles: Vec<Vec<usize>> = Vec::new();
        for start in 0..names.len() {
            if cycles.len() >= MAX_CYCLES {
                break;
            }
            if size[component[start]] == 1 && !adj[start].contains(&start) {
                continue;
            }
            // Nodes below `start` were already exhausted as cycle starts.
            let members: Vec<bool> = (0..names.len())
                .map(|v| v >= start && component[v] == component[start])
                .collect();
            let allowed = reachable_both_ways(&adj, &members, start);
            let mut search = CircuitSearch {
                adj: &adj,
                allowed: &allowed,
                start,
                blocked: vec![false; names.len()],
                blocked_by: vec![BTreeSet::new(); names.len()],
                stack: Vec::new(),
                found: &mut cycles,
            };
            search.circuit(start);
        }
        cycles.truncate(MAX_CYCLES);

        let named: BTreeSet<Vec<String>> = cycles
            .into_iter()
            .map(|c| c.into_iter().map(|i| names[i].to_string()).collect())
            .collect();
        named.into_iter().collect()
    }
}

/// Upper bound on cycles reported for one graph.
pub const MAX_CYCLES: usize = 1000;

// ---------------------------------------------------------------------------
// Cycle enumeration
// ---------------------------------------------------------------------------

/// Component id of every node (Tarjan).
fn strongly_connected(adj: &[Vec<usize>]) -> Vec<usize> {
    struct Tarjan<'a> {
        adj: &'a [Vec<usize>],
        order: Vec<Option<usize>>,
        low: Vec<usize>,
        on_stack: Vec<bool>,
        stack: Vec<usize>,
        component: Vec<usize>,
        next_order: usize,
        next_component: usize,
    }

    impl Tarjan<'_> {
        fn visit(&mut self, v: usize) {
            self.order[v] = Some(self.next_order);
            self.low[v] = self.next_order;
            self.next_order += 1;
            self.stack.push(v);
            self.on_stack[v] = true;

            let adj = self.adj;
            for &w in &adj[v] {
                match self.order[w] {
                    None => {
                        self.visit(w);
                        self.low[v] = self.low[v].min(self.low[w]);
                    }
                    Some(ow) if self.on_stack[w] => self.low[v] = self.low[v].min(ow),
                    Some(_) => {}
                }
            }

            if Some(self.low[v]) == self.order[v] {
                while let Some(w) = self.stack.pop() {
                    self.on_stack[w] = false;
                    self.component[w] = self.next_component;
                    if w == v {
                        break;
                    }
                }
                self.next_component += 1;
            }
        }
    }

    let n = adj.len();
    let mut t = Tarjan {
        adj,
        order: vec![None; n],
        low: vec![0; n],
        on_stack: vec![false; n],
        stack: Vec::new(),
        component: vec![0; n],
        next_order: 0,
        next_component: 0,
    };
    for v in 0..n {
        if t.order[v].is_none() {
            t.visit(v);
        }
    }
    t.component
}

/// Nodes among `members` that `start` reaches and that reach `start`.
fn reachable_both_ways(adj: &[Vec<usize>], members: &[bool], start: usize) -> Vec<bool> {
    let n = adj.len();
    let mut reverse: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (v, deps) in adj.iter().enumerate() {
        if members[v] {
            for &w in deps {
                if members[w] {
                    reverse[w].push(v);
                }
            }
        }
    }
    let forward = flood(n, start, |v| adj[v].iter().copied().filter(|w| members[*w]).collect());
    let backward = flood(n, start, |v| reverse[v].clone());
    (0..n).map(|v| forward[v] && backward[v]).collect()
}

fn flood(n: usize, start: usize, next: impl Fn(usize) -> Vec<usize>) -> Vec<bool> {
    let mut seen = vec![false; n];
    let mut todo = vec![start];
    seen[start] = true;
    while let Some(v) = todo.pop() {
        for w in next(v) {
            if !seen[w] {
                seen[w] = true;
                todo.push(w);
            }
        }
    }
    seen
}

struct CircuitSearch<'a> {
    adj: &'a [Vec<usize>],
    allowed: &'a [bool],
    start: usize,
    blocked: Vec<bool>,
    blocked_by: Vec<BTreeSet<usize>>,
    stack: Vec<usize>,
    found: &'a mut Vec<Vec<usize>>,
}

impl CircuitSearch<'_> {
    fn circuit(&mut self, v: usize) -> bool {
        let mut closed = false;
        self.stack.push(v);
        self.blocked[v] = true;

        let adj = self.adj;
        for &w in &adj[v] {
            if self.found.len() >= MAX_CYCLES {
                break;
            }
            if !self.allowed[w] {
                continue;
            }
            if w == self.start {
                self.found.push(self.stack.clone());
                closed = true;
            } else if !self.blocked[w] && self.circuit(w) {
                closed = true;
            }
        }

        if closed {
            self.unblock(v);
        } else {
            for &w in &adj[v] {
                if self.allowed[w] {
                    self.blocked_by[w].insert(v);
                }
            }
        }
        self.stack.pop();
        closed
    }

    fn unblock(&mut self, v: usize) {
        self.blocked[v] = false;
        let waiting = std::mem::take(&mut self.blocked_by[v]);
        for w in waiting {
            if self.blocked[w] {
                self.unblock(w);
            }
        }
    }
}

fn module_name(source_root: &Path, file: &Path) -> String {
    paths::to_slash(&paths::relative_to(source_root, file))
}

/// Symlinked directories are not followed; symlinked files are.
fn collect_sources(dir: &Path, extensions: &[String], out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if file_type.is_symlink() && path.is_dir() {
            continue;
        }
        if file_type.is_dir() {
            if name.starts_with('.') || SKIP_DIRS.contains(&name) {
                continue;
            }
            collect_sources(&path, extensions, out)?;
        } else if has_extension(&path, extensions) && !name.ends_with(".d.ts") {
            out.push(paths::normalize(&path));
        }
    }
    Ok(())
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x.trim_start_matches('.') == e))
}

// ---------------------------------------------------------------------------
// Specifier extraction
// ---------------------------------------------------------------------------

fn static_import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\b(?:import|export)\s+(?:type\s+)?(?:[^'";]*?\s+from\s+)?['"]([^'"\n]+)['"]"#)
            .unwrap()
    })
}

fn call_import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\b(?:import|require)\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#).unwrap()
    })
}

/// Blank out `//` and `/* */` comments, leaving string and template
/// literals intact. Newlines are kept.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q || (c == '\n' && q != '`') {
                quote = None;
            }
            continue;
        }
        let next = chars.peek().copied();
        match (c, next) {
            ('/', Some('/')) => {
                while chars.peek().is_some_and(|n| *n != '\n') {
                    chars.next();
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = ' ';
                for n in chars.by_ref() {
                    if n == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
                out.push(' ');
            }
            ('\'' | '"' | '`', _) => {
                quote = Some(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Module specifiers referenced by `source`, in order of appearance.
pub fn extract_specifiers(source: &str) -> Vec<String> {
    let text = strip_comments(source);
    let mut hits: Vec<(usize, String)> = static_import_re()
        .captures_iter(&text)
        .chain(call_import_re().captures_iter(&text))
        .filter_map(|c| c.get(1).map(|m| (m.start(), m.as_str().to_string())))
        .collect();
    hits.sort();
    let mut seen = HashSet::new();
    hits.into_iter()
        .map(|(_, s)| s)
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// Map a relative specifier to a known source file.
///
/// Tries the exact path, each source extension, TypeScript's `.js` → `.ts`
/// mapping, then `index.*` inside a directory.
pub fn resolve_specifier(from: &Path, spec: &str, known: &HashSet<PathBuf>) -> Option<PathBuf> {
    if !(spec == "." || spec == ".." || spec.starts_with("./") || spec.starts_with("../")) {
        return None;
    }
    let dir = from.parent()?;
    let base = paths::normalize(&dir.join(spec));
    let hit = |p: PathBuf| known.contains(&p).then_some(p);

    if let Some(p) = hit(base.clone()) {
        return Some(p);
    }

    const SOURCE_EXTS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];
    let swapped: &[&str] = match base.extension().and_then(|e| e.to_str()) {
        Some("js") | Some("jsx") => &["ts", "tsx"],
        Some("mjs") => &["mts"],
        Some("cjs") => &["cts"],
        _ => &[],
    };
    for ext in swapped {
        if let Some(p) = hit(base.with_extension(ext)) {
            return Some(p);
        }
    }

    for ext in SOURCE_EXTS {
        let mut candidate = base.clone().into_os_string();
        candidate.push(".");
        candidate.push(ext);
        if let Some(p) = hit(PathBuf::from(candidate)) {
            return Some(p);
        }
    }

    SOURCE_EXTS
        .iter()
        .find_map(|ext| hit(base.join(format!("index.{ext}"))))
}

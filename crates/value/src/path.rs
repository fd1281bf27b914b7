//! Path segment parsing shared by the resolver's `path` grammar production.

/// One step of a dotted/bracketed path: `a.b[0].c` → `[Key(a), Key(b), Index(0), Key(c)]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(i64),
}

/// Split `a.b[0].c` (or `a.b.0.c`, the teacher's original form) into segments.
/// Accepts both `[N]` bracket indices and bare numeric dotted segments.
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();

    let flush = |current: &mut String, segments: &mut Vec<PathSegment>| {
        if current.is_empty() {
            return;
        }
        if let Ok(idx) = current.parse::<i64>() {
            segments.push(PathSegment::Index(idx));
        } else {
            segments.push(PathSegment::Key(current.clone()));
        }
        current.clear();
    };

    while let Some(c) = chars.next() {
        match c {
            '.' => flush(&mut current, &mut segments),
            '[' => {
                flush(&mut current, &mut segments);
                let mut idx = String::new();
                for c2 in chars.by_ref() {
                    if c2 == ']' {
                        break;
                    }
                    idx.push(c2);
                }
                if let Ok(n) = idx.trim().parse::<i64>() {
                    segments.push(PathSegment::Index(n));
                } else if !idx.trim().is_empty() {
                    segments.push(PathSegment::Key(idx.trim().to_string()));
                }
            }
            other => current.push(other),
        }
    }
    flush(&mut current, &mut segments);
    segments
}

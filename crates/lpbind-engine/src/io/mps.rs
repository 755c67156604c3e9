//! Fixed and free MPS reader and writer.

use super::{col_label, format_num, row_label};
use crate::error::EngineError;
use crate::problem::{BoundType, ColKind, Direction, NativeProblem};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// MPS layout variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpsFormat {
    /// Fields at fixed character positions, names up to 8 characters.
    Fixed,
    /// Whitespace-separated fields.
    Free,
}

impl MpsFormat {
    fn as_str(self) -> &'static str {
        match self {
            MpsFormat::Fixed => "fixed",
            MpsFormat::Free => "free",
        }
    }

    fn valid_name(self, name: &str) -> bool {
        !name.is_empty()
            && !name.contains(char::is_whitespace)
            && (self == MpsFormat::Free || name.len() <= 8)
    }
}

// Fixed-format field spans, 0-based and end-exclusive.
const FIXED_FIELDS: [(usize, usize); 6] = [(1, 3), (4, 12), (14, 22), (24, 36), (39, 47), (49, 61)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Name,
    ObjSense,
    Rows,
    Columns,
    Rhs,
    Ranges,
    Bounds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowType {
    Objective,
    Free,
    Less,
    Greater,
    Equal,
}

struct Reader {
    format: MpsFormat,
    prob: NativeProblem,
    line: usize,
    obj_row: Option<String>,
    row_index: HashMap<String, usize>,
    row_types: Vec<RowType>,
    rhs: Vec<f64>,
    ranges: Vec<Option<f64>>,
    col_index: HashMap<String, usize>,
    // Whether any BOUNDS record touched the column.
    col_bounded: Vec<bool>,
    in_marker: bool,
    rhs_set: Option<String>,
    range_set: Option<String>,
    bound_set: Option<String>,
}

impl Reader {
    fn error(&self, message: impl Into<String>) -> EngineError {
        EngineError::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    fn fields(&self, text: &str) -> Vec<String> {
        match self.format {
            MpsFormat::Free => text.split_whitespace().map(str::to_string).collect(),
            MpsFormat::Fixed => {
                let mut out = Vec::new();
                for (start, end) in FIXED_FIELDS {
                    if start >= text.len() {
                        break;
                    }
                    let end = end.min(text.len());
                    out.push(text.get(start..end).unwrap_or("").trim().to_string());
                }
                // Trailing empty fields carry no data.
                while out.last().is_some_and(String::is_empty) {
                    out.pop();
                }
                // Only ROWS and BOUNDS records use the type field.
                if out.first().is_some_and(String::is_empty) {
                    out.remove(0);
                }
                out
            }
        }
    }

    fn number(&self, text: &str) -> Result<f64, EngineError> {
        text.parse::<f64>()
            .map_err(|_| self.error(format!("invalid number '{text}'")))
    }

    fn row(&self, name: &str) -> Result<Option<usize>, EngineError> {
        if self.obj_row.as_deref() == Some(name) {
            return Ok(None);
        }
        self.row_index
            .get(name)
            .copied()
            .map(Some)
            .ok_or_else(|| self.error(format!("row '{name}' not found")))
    }

    fn col(&self, name: &str) -> Result<usize, EngineError> {
        self.col_index
            .get(name)
            .copied()
            .ok_or_else(|| self.error(format!("column '{name}' not found")))
    }

    fn add_row(&mut self, kind: &str, name: &str) -> Result<(), EngineError> {
        let row_type = match kind {
            "N" if self.obj_row.is_none() => {
                self.obj_row = Some(name.to_string());
                self.prob.set_obj_name(Some(name));
                return Ok(());
            }
            "N" => RowType::Free,
            "L" => RowType::Less,
            "G" => RowType::Greater,
            "E" => RowType::Equal,
            other => return Err(self.error(format!("invalid row type '{other}'"))),
        };
        if self.row_index.contains_key(name) {
            return Err(self.error(format!("row '{name}' multiply specified")));
        }
        let i = self.prob.add_rows(1)?;
        self.prob.set_row_name(i, Some(name))?;
        self.row_index.insert(name.to_string(), i);
        self.row_types.push(row_type);
        self.rhs.push(0.0);
        self.ranges.push(None);
        Ok(())
    }

    fn column_record(&mut self, fields: &[String]) -> Result<(), EngineError> {
        if fields.len() >= 3 && fields[1].trim_matches('\'') == "MARKER" {
            match fields[fields.len() - 1].trim_matches('\'') {
                "INTORG" => self.in_marker = true,
                "INTEND" => self.in_marker = false,
                other => return Err(self.error(format!("invalid marker '{other}'"))),
            }
            return Ok(());
        }
        if fields.len() != 3 && fields.len() != 5 {
            return Err(self.error("wrong number of fields in COLUMNS record"));
        }
        let name = &fields[0];
        let j = match self.col_index.get(name) {
            Some(&j) => j,
            None => {
                let j = self.prob.add_cols(1)?;
                self.prob.set_col_name(j, Some(name))?;
                self.prob.set_col_bounds(j, 0.0, f64::INFINITY)?;
                if self.in_marker {
                    self.prob.set_col_kind(j, ColKind::Integer)?;
                }
                self.col_index.insert(name.clone(), j);
                self.col_bounded.push(false);
                j
            }
        };
        for pair in fields[1..].chunks(2) {
            let value = self.number(&pair[1])?;
            match self.row(&pair[0])? {
                None => self.prob.set_obj_coef(j, value)?,
                Some(i) => {
                    let mut entries = self.prob.mat_col(j)?;
                    if entries.iter().any(|&(r, _)| r == i) {
                        return Err(self.error(format!(
                            "column '{name}' has multiple entries in row '{}'",
                            pair[0]
                        )));
                    }
                    entries.push((i, value));
                    self.prob.set_mat_col(j, &entries)?;
                }
            }
        }
        Ok(())
    }

    /// RHS and RANGES records share a layout: optional set name, then pairs.
    fn vector_record(&mut self, fields: &[String], ranges: bool) -> Result<(), EngineError> {
        let (set, pairs) = if fields.len() % 2 == 1 {
            (Some(fields[0].as_str()), &fields[1..])
        } else {
            (None, fields)
        };
        if pairs.is_empty() {
            return Err(self.error("wrong number of fields"));
        }
        let set = set.unwrap_or("");
        let current = if ranges { &mut self.range_set } else { &mut self.rhs_set };
        // Only the first set named in the section is used.
        if *current.get_or_insert_with(|| set.to_string()) != set {
            return Ok(());
        }
        for pair in pairs.chunks(2) {
            let value = self.number(&pair[1])?;
            match self.row(&pair[0])? {
                None if ranges => {
                    return Err(self.error("objective row cannot have a range"));
                }
                None => self.prob.set_obj_coef(0, -value)?,
                Some(i) if ranges => self.ranges[i - 1] = Some(value),
                Some(i) => self.rhs[i - 1] = value,
            }
        }
        Ok(())
    }

    fn bound_record(&mut self, fields: &[String]) -> Result<(), EngineError> {
        let kind = fields
            .first()
            .ok_or_else(|| self.error("missing bound type"))?
            .as_str();
        let needs_value = !matches!(kind, "FR" | "MI" | "PL" | "BV");
        let rest = &fields[1..];
        let (set, col, value) = match (needs_value, rest.len()) {
            (true, 3) => (rest[0].as_str(), rest[1].as_str(), Some(rest[2].as_str())),
            (true, 2) => ("", rest[0].as_str(), Some(rest[1].as_str())),
            (false, 2) => (rest[0].as_str(), rest[1].as_str(), None),
            (false, 1) => ("", rest[0].as_str(), None),
            _ => return Err(self.error("wrong number of fields in BOUNDS record")),
        };
        if *self.bound_set.get_or_insert_with(|| set.to_string()) != set {
            return Ok(());
        }
        let j = self.col(col)?;
        let value = match value {
            Some(text) => self.number(text)?,
            None => 0.0,
        };
        let (mut lower, mut upper) = self.prob.col_bounds(j)?;
        match kind {
            "UP" => {
                if value < 0.0 && lower == 0.0 {
                    warn!(
                        component = "engine",
                        operation = "read_mps",
                        status = "warn",
                        line = self.line,
                        "Negative upper bound with zero lower bound; lower bound set to -inf"
                    );
                    lower = f64::NEG_INFINITY;
                }
                upper = value;
            }
            "LO" => lower = value,
            "FX" => (lower, upper) = (value, value),
            "FR" => (lower, upper) = (f64::NEG_INFINITY, f64::INFINITY),
            "MI" => lower = f64::NEG_INFINITY,
            "PL" => upper = f64::INFINITY,
            "BV" => {
                (lower, upper) = (0.0, 1.0);
                self.prob.set_col_kind(j, ColKind::Integer)?;
            }
            "LI" => {
                lower = value;
                self.prob.set_col_kind(j, ColKind::Integer)?;
            }
            "UI" => {
                upper = value;
                self.prob.set_col_kind(j, ColKind::Integer)?;
            }
            other => return Err(self.error(format!("invalid bound type '{other}'"))),
        }
        if lower > upper {
            return Err(self.error(format!("column '{col}' has inconsistent bounds")));
        }
        self.prob.set_col_bounds(j, lower, upper)?;
        self.col_bounded[j - 1] = true;
        Ok(())
    }

    fn finish(mut self) -> Result<NativeProblem, EngineError> {
        for (k, &row_type) in self.row_types.iter().enumerate() {
            let rhs = self.rhs[k];
            let (lower, upper) = match (row_type, self.ranges[k]) {
                (RowType::Objective | RowType::Free, _) => (f64::NEG_INFINITY, f64::INFINITY),
                (RowType::Less, None) => (f64::NEG_INFINITY, rhs),
                (RowType::Greater, None) => (rhs, f64::INFINITY),
                (RowType::Equal, None) => (rhs, rhs),
                (RowType::Less, Some(r)) => (rhs - r.abs(), rhs),
                (RowType::Greater, Some(r)) => (rhs, rhs + r.abs()),
                (RowType::Equal, Some(r)) if r >= 0.0 => (rhs, rhs + r),
                (RowType::Equal, Some(r)) => (rhs + r, rhs),
            };
            self.prob.set_row_bounds(k + 1, lower, upper)?;
        }
        // Integer columns never given bounds are binary.
        for (k, &bounded) in self.col_bounded.iter().enumerate() {
            if !bounded && self.prob.col_kind(k + 1)? == ColKind::Integer {
                self.prob.set_col_bounds(k + 1, 0.0, 1.0)?;
            }
        }
        Ok(self.prob)
    }
}

/// Read a problem from an MPS file.
pub fn read_mps(path: &Path, format: MpsFormat) -> Result<NativeProblem, EngineError> {
    let text = fs::read_to_string(path)?;
    let mut reader = Reader {
        format,
        prob: NativeProblem::new(),
        line: 0,
        obj_row: None,
        row_index: HashMap::new(),
        row_types: Vec::new(),
        rhs: Vec::new(),
        ranges: Vec::new(),
        col_index: HashMap::new(),
        col_bounded: Vec::new(),
        in_marker: false,
        rhs_set: None,
        range_set: None,
        bound_set: None,
    };
    let mut section = None;
    let mut ended = false;
    for (n, raw) in text.lines().enumerate() {
        reader.line = n + 1;
        let line = raw.trim_end();
        if line.is_empty() || line.starts_with('*') {
            continue;
        }
        if !line.starts_with(char::is_whitespace) {
            let mut words = line.split_whitespace();
            let header = words.next().unwrap_or("");
            section = match header {
                "NAME" => {
                    let name = line[4..].trim();
                    reader.prob.set_name((!name.is_empty()).then_some(name));
                    Some(Section::Name)
                }
                "OBJSENSE" | "OBJSENS" => {
                    if let Some(sense) = words.next() {
                        let dir = parse_sense(&reader, sense)?;
                        reader.prob.set_obj_dir(dir);
                    }
                    Some(Section::ObjSense)
                }
                "ROWS" => Some(Section::Rows),
                "COLUMNS" => Some(Section::Columns),
                "RHS" => Some(Section::Rhs),
                "RANGES" => Some(Section::Ranges),
                "BOUNDS" => Some(Section::Bounds),
                "ENDATA" => {
                    ended = true;
                    break;
                }
                other => return Err(reader.error(format!("unknown section '{other}'"))),
            };
            continue;
        }
        let fields = reader.fields(line);
        if fields.is_empty() {
            continue;
        }
        match section {
            Some(Section::ObjSense) => {
                let dir = parse_sense(&reader, &fields[0])?;
                reader.prob.set_obj_dir(dir);
            }
            Some(Section::Rows) => {
                if fields.len() != 2 {
                    return Err(reader.error("wrong number of fields in ROWS record"));
                }
                reader.add_row(&fields[0], &fields[1])?;
            }
            Some(Section::Columns) => reader.column_record(&fields)?,
            Some(Section::Rhs) => reader.vector_record(&fields, false)?,
            Some(Section::Ranges) => reader.vector_record(&fields, true)?,
            Some(Section::Bounds) => reader.bound_record(&fields)?,
            Some(Section::Name) | None => {
                return Err(reader.error("data record outside of a section"));
            }
        }
    }
    if !ended {
        return Err(reader.error("missing ENDATA"));
    }
    let prob = reader.finish()?;
    debug!(
        component = "engine",
        operation = "read_mps",
        status = "success",
        format = format.as_str(),
        num_rows = prob.num_rows(),
        num_cols = prob.num_cols(),
        nnz = prob.nnz(),
        "Read MPS file"
    );
    Ok(prob)
}

fn parse_sense(reader: &Reader, word: &str) -> Result<Direction, EngineError> {
    match word {
        "MAX" | "MAXIMIZE" => Ok(Direction::Maximize),
        "MIN" | "MINIMIZE" => Ok(Direction::Minimize),
        other => Err(reader.error(format!("invalid objective sense '{other}'"))),
    }
}

struct Writer {
    format: MpsFormat,
    out: String,
}

impl Writer {
    fn record(&mut self, kind: &str, fields: &[&str]) {
        let line = match self.format {
            MpsFormat::Fixed => {
                let mut line = format!(" {kind:<2}");
                for (k, field) in fields.iter().enumerate() {
                    let (start, _) = FIXED_FIELDS[k + 1];
                    while line.len() < start {
                        line.push(' ');
                    }
                    line.push_str(field);
                }
                line
            }
            MpsFormat::Free => {
                let mut line = format!(" {kind:<2}");
                for field in fields {
                    line.push(' ');
                    line.push_str(field);
                }
                line
            }
        };
        self.out.push_str(line.trim_end());
        self.out.push('\n');
    }

    fn num(&self, v: f64) -> String {
        match self.format {
            MpsFormat::Fixed => format_num(v, 12),
            MpsFormat::Free => format_num(v, 24),
        }
    }
}

/// Write `prob` as an MPS file.
pub fn write_mps(prob: &NativeProblem, format: MpsFormat, path: &Path) -> Result<(), EngineError> {
    let valid = |name: &str| format.valid_name(name);
    let rows: Vec<String> = (1..=prob.num_rows()).map(|i| row_label(prob, i, valid)).collect();
    let cols: Vec<String> = (1..=prob.num_cols()).map(|j| col_label(prob, j, valid)).collect();
    let obj = match prob.obj_name() {
        Some(name) if valid(name) && !rows.iter().any(|r| r == name) => name.to_string(),
        _ => "obj".to_string(),
    };

    let mut w = Writer {
        format,
        out: String::new(),
    };
    let _ = writeln!(
        w.out,
        "* Problem:    {}\n* Rows:       {}\n* Columns:    {}\n* Non-zeros:  {}",
        prob.name().unwrap_or("?"),
        prob.num_rows(),
        prob.num_cols(),
        prob.nnz()
    );
    let name = prob.name().filter(|n| format.valid_name(n)).unwrap_or("");
    let _ = writeln!(w.out, "NAME          {name}");
    if prob.obj_dir() == Direction::Maximize {
        w.out.push_str("OBJSENSE\n    MAX\n");
    }

    w.out.push_str("ROWS\n");
    w.record("N", &[&obj]);
    let mut row_types = Vec::with_capacity(rows.len());
    for (k, row) in prob.rows.iter().enumerate() {
        let kind = match BoundType::of(row.lower, row.upper) {
            BoundType::Free => "N",
            BoundType::Lower | BoundType::Double => "G",
            BoundType::Upper => "L",
            BoundType::Fixed => "E",
        };
        row_types.push(kind);
        w.record(kind, &[&rows[k]]);
    }

    w.out.push_str("COLUMNS\n");
    let mut in_marker = false;
    let mut markers = 0;
    for (k, col) in prob.cols.iter().enumerate() {
        let j = k + 1;
        let integer = col.kind == ColKind::Integer;
        if integer != in_marker {
            let label = if integer { "INTORG" } else { "INTEND" };
            let marker = format!("M{markers:07}");
            w.record("", &[&marker, "'MARKER'", "", &format!("'{label}'")]);
            if !integer {
                markers += 1;
            }
            in_marker = integer;
        }
        let mut entries: Vec<(String, f64)> = Vec::new();
        if col.obj != 0.0 {
            entries.push((obj.clone(), col.obj));
        }
        for (i, v) in prob.mat_col(j)? {
            entries.push((rows[i - 1].clone(), v));
        }
        if entries.is_empty() {
            entries.push((obj.clone(), 0.0));
        }
        for pair in entries.chunks(2) {
            let first = w.num(pair[0].1);
            match pair.get(1) {
                Some((row, v)) => {
                    let second = w.num(*v);
                    w.record("", &[&cols[k], &pair[0].0, &first, row, &second]);
                }
                None => w.record("", &[&cols[k], &pair[0].0, &first]),
            }
        }
    }
    if in_marker {
        let marker = format!("M{markers:07}");
        w.record("", &[&marker, "'MARKER'", "", "'INTEND'"]);
    }

    let shift = prob.obj_coef(0)?;
    let mut rhs: Vec<(String, f64)> = Vec::new();
    if shift != 0.0 {
        rhs.push((obj.clone(), -shift));
    }
    for (k, row) in prob.rows.iter().enumerate() {
        let v = match row_types[k] {
            "G" | "E" => row.lower,
            "L" => row.upper,
            _ => 0.0,
        };
        if v != 0.0 {
            rhs.push((rows[k].clone(), v));
        }
    }
    if !rhs.is_empty() {
        w.out.push_str("RHS\n");
        for (name, v) in rhs {
            let v = w.num(v);
            w.record("", &["RHS1", &name, &v]);
        }
    }

    let ranges: Vec<(usize, f64)> = prob
        .rows
        .iter()
        .enumerate()
        .filter(|(_, r)| BoundType::of(r.lower, r.upper) == BoundType::Double)
        .map(|(k, r)| (k, r.upper - r.lower))
        .collect();
    if !ranges.is_empty() {
        w.out.push_str("RANGES\n");
        for (k, v) in ranges {
            let v = w.num(v);
            w.record("", &["RNG1", &rows[k], &v]);
        }
    }

    let mut bounds: Vec<(&str, usize, Option<f64>)> = Vec::new();
    for (k, col) in prob.cols.iter().enumerate() {
        let (lo, hi) = (col.entity.lower, col.entity.upper);
        let integer = col.kind == ColKind::Integer;
        match BoundType::of(lo, hi) {
            BoundType::Free => bounds.push(("FR", k, None)),
            BoundType::Fixed => bounds.push(("FX", k, Some(lo))),
            BoundType::Lower => {
                if lo != 0.0 {
                    bounds.push(("LO", k, Some(lo)));
                } else if integer {
                    bounds.push(("PL", k, None));
                }
            }
            BoundType::Upper => {
                bounds.push(("MI", k, None));
                bounds.push(("UP", k, Some(hi)));
            }
            BoundType::Double => {
                if lo != 0.0 {
                    bounds.push(("LO", k, Some(lo)));
                }
                bounds.push(("UP", k, Some(hi)));
            }
        }
    }
    if !bounds.is_empty() {
        w.out.push_str("BOUNDS\n");
        for (kind, k, v) in bounds {
            match v {
                Some(v) => {
                    let v = w.num(v);
                    w.record(kind, &["BND1", &cols[k], &v]);
                }
                None => w.record(kind, &["BND1", &cols[k]]),
            }
        }
    }
    w.out.push_str("ENDATA\n");

    fs::write(path, w.out)?;
    debug!(
        component = "engine",
        operation = "write_mps",
        status = "success",
        format = format.as_str(),
        num_rows = prob.num_rows(),
        num_cols = prob.num_cols(),
        "Wrote MPS file"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("lpbind-engine-mps-{}-{tag}.mps", std::process::id()))
    }

    fn sample() -> NativeProblem {
        let mut p = NativeProblem::new();
        p.set_name(Some("sample"));
        p.add_rows(3).unwrap();
        p.add_cols(3).unwrap();
        p.set_row_name(1, Some("cap")).unwrap();
        p.set_row_name(2, Some("dem")).unwrap();
        p.set_row_name(3, Some("band")).unwrap();
        p.set_row_bounds(1, f64::NEG_INFINITY, 10.0).unwrap();
        p.set_row_bounds(2, 2.0, 2.0).unwrap();
        p.set_row_bounds(3, -1.0, 4.0).unwrap();
        p.set_col_name(1, Some("x")).unwrap();
        p.set_col_name(2, Some("y")).unwrap();
        p.set_col_name(3, Some("z")).unwrap();
        p.set_col_bounds(1, 0.0, 5.0).unwrap();
        p.set_col_bounds(2, f64::NEG_INFINITY, f64::INFINITY).unwrap();
        p.set_col_bounds(3, 0.0, f64::INFINITY).unwrap();
        p.set_col_kind(3, ColKind::Integer).unwrap();
        p.set_obj_dir(Direction::Maximize);
        p.set_obj_coef(0, 1.5).unwrap();
        p.set_obj_coef(1, 3.0).unwrap();
        p.set_obj_coef(3, -2.0).unwrap();
        p.load_matrix(&[(1, 1, 1.0), (1, 2, 2.0), (2, 2, 1.0), (3, 1, 1.0), (3, 3, 4.0)])
            .unwrap();
        p
    }

    fn assert_same(a: &NativeProblem, b: &NativeProblem) {
        assert_eq!(a.num_rows(), b.num_rows());
        assert_eq!(a.num_cols(), b.num_cols());
        assert_eq!(a.matrix(), b.matrix());
        assert_eq!(a.obj_dir(), b.obj_dir());
        for i in 1..=a.num_rows() {
            assert_eq!(a.row_name(i).unwrap(), b.row_name(i).unwrap());
            assert_eq!(a.row_bounds(i).unwrap(), b.row_bounds(i).unwrap());
        }
        for j in 0..=a.num_cols() {
            assert_eq!(a.obj_coef(j).unwrap(), b.obj_coef(j).unwrap());
        }
        for j in 1..=a.num_cols() {
            assert_eq!(a.col_bounds(j).unwrap(), b.col_bounds(j).unwrap());
            assert_eq!(a.col_kind(j).unwrap(), b.col_kind(j).unwrap());
        }
    }

    #[test]
    fn test_fixed_and_free_preserve_problem() {
        let original = sample();
        for format in [MpsFormat::Fixed, MpsFormat::Free] {
            let path = temp_path(format.as_str());
            write_mps(&original, format, &path).unwrap();
            let back = read_mps(&path, format).unwrap();
            let _ = fs::remove_file(&path);
            assert_same(&original, &back);
        }
    }

    #[test]
    fn test_unbounded_integer_marker_defaults_to_binary() {
        let path = temp_path("marker");
        fs::write(
            &path,
            "NAME          TINY\nROWS\n N  cost\n L  lim\nCOLUMNS\n    MARKER                 'MARKER'                 'INTORG'\n    b         cost         1.0   lim          1.0\n    MARKER                 'MARKER'                 'INTEND'\nRHS\n    RHS       lim          1.0\nENDATA\n",
        )
        .unwrap();
        let p = read_mps(&path, MpsFormat::Free).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(p.col_kind(1).unwrap(), ColKind::Integer);
        assert_eq!(p.col_bounds(1).unwrap(), (0.0, 1.0));
        assert_eq!(p.row_bounds(1).unwrap(), (f64::NEG_INFINITY, 1.0));
    }

    #[test]
    fn test_unknown_row_is_parse_error() {
        let path = temp_path("badrow");
        fs::write(&path, "NAME\nROWS\n N  obj\nCOLUMNS\n    x  nope  1\nENDATA\n").unwrap();
        let err = read_mps(&path, MpsFormat::Free).unwrap_err();
        let _ = fs::remove_file(&path);
        assert!(matches!(err, EngineError::Parse { line: 5, .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_mps(Path::new("/nonexistent/lpbind/none.mps"), MpsFormat::Fixed).unwrap_err();
        assert_eq!(err.code(), "ENGINE_IO");
    }
}

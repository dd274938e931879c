//! Definitions for tracking source position information of specifications.
//!
//! Positions are only ever attached to definitions by the lowering step; graph
//! nodes report problems at the position of the definition that owns them.

use itertools::Itertools;
use std::fmt::Write;
use std::sync::{OnceLock, PoisonError, RwLock};
use std::cmp;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
/// Handle to a position in a [PositionTable]
/// The index refers to the index in the [PositionTable::indices] vector.
pub struct PosIdx(u32);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
/// Handle to a file in a [PositionTable]
/// The index refers to the index in the [PositionTable::files] vector.
pub struct FileIdx(u32);

/// A source specification file
struct File {
    /// Name of the file
    name: String,
    /// The source code of the file
    source: String,
}

struct PosData {
    /// The file in the program. The index refers to the index in the
    /// [PositionTable::files] vector.
    file: FileIdx,
    /// Start of the span
    start: usize,
    /// End of the span
    end: usize,
}

/// Source position information for a specification.
struct PositionTable {
    /// The source files of the program
    files: Vec<File>,
    /// Mapping from indexes to position data
    indices: Vec<PosData>,
}

impl PositionTable {
    /// The unknown position
    const UNKNOWN: PosIdx = PosIdx(0);

    /// Create a new position table where the first file and first position are unknown
    fn new() -> Self {
        let mut table = PositionTable {
            files: Vec::new(),
            indices: Vec::new(),
        };
        table.add_file("unknown".to_string(), "".to_string());
        let pos = table.add_pos(FileIdx(0), 0, 0);
        debug_assert!(pos == Self::UNKNOWN);
        table
    }

    fn add_file(&mut self, name: String, source: String) -> FileIdx {
        let file = File { name, source };
        let file_idx = self.files.len();
        self.files.push(file);
        FileIdx(file_idx as u32)
    }

    fn get_file_data(&self, file: FileIdx) -> &File {
        &self.files[file.0 as usize]
    }

    fn add_pos(&mut self, file: FileIdx, start: usize, end: usize) -> PosIdx {
        let pos = PosData { file, start, end };
        let pos_idx = self.indices.len();
        self.indices.push(pos);
        PosIdx(pos_idx as u32)
    }

    fn get_pos(&self, pos: PosIdx) -> &PosData {
        &self.indices[pos.0 as usize]
    }
}

/// The global position table.
///
/// Unlike the per-graph structures, this table is shared by every graph in the
/// process, so it is guarded by a lock and may be used from parallel passes.
pub struct GlobalPositionTable;

impl GlobalPositionTable {
    fn table() -> &'static RwLock<PositionTable> {
        static TABLE: OnceLock<RwLock<PositionTable>> = OnceLock::new();
        TABLE.get_or_init(|| RwLock::new(PositionTable::new()))
    }

    fn read<T>(f: impl FnOnce(&PositionTable) -> T) -> T {
        let table = Self::table()
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f(&table)
    }

    fn write<T>(f: impl FnOnce(&mut PositionTable) -> T) -> T {
        let mut table = Self::table()
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut table)
    }

    /// Add a new file to the position table
    pub fn add_file(name: String, source: String) -> FileIdx {
        Self::write(|t| t.add_file(name, source))
    }

    /// Add a new position to the position table
    pub fn add_pos(file: FileIdx, start: usize, end: usize) -> GPosIdx {
        GPosIdx(Self::write(|t| t.add_pos(file, start, end)))
    }

    /// Source text of a registered file.
    pub fn get_source(file: FileIdx) -> String {
        Self::read(|t| t.get_file_data(file).source.clone())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
/// A position index backed by the [GlobalPositionTable]
pub struct GPosIdx(pub PosIdx);

impl Default for GPosIdx {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl GPosIdx {
    /// Symbol for the unknown position
    pub const UNKNOWN: GPosIdx = GPosIdx(PositionTable::UNKNOWN);

    /// Convert the position into an optional.
    /// Returns `None` if the position is the unknown position.
    pub fn into_option(self) -> Option<Self> {
        if self == Self::UNKNOWN {
            None
        } else {
            Some(self)
        }
    }

    /// Returns the
    /// 1. lines associated with this span
    /// 2. start position of the first line in span
    /// 3. line number of the span
    fn get_lines(table: &PositionTable, pos_d: &PosData) -> (Vec<String>, usize, usize) {
        let file = &table.get_file_data(pos_d.file).source;

        let lines = file.split('\n').collect_vec();
        let mut pos: usize = 0;
        let mut linum: usize = 1;
        let mut collect_lines = false;
        let mut buf = Vec::new();

        let mut out_line: usize = 0;
        let mut out_idx: usize = 0;
        for l in lines {
            let next_pos = pos + l.len();
            if pos_d.start >= pos && pos_d.start <= next_pos {
                out_line = linum;
                out_idx = pos;
                collect_lines = true;
            }
            if collect_lines && pos_d.end >= pos {
                buf.push(l.to_string())
            }
            if pos_d.end <= next_pos {
                break;
            }
            pos = next_pos + 1;
            linum += 1;
        }
        (buf, out_idx, out_line)
    }

    /// Format this position with a the error message `err_msg`
    pub fn format<S: AsRef<str>>(&self, err_msg: S) -> String {
        GlobalPositionTable::read(|table| {
            let pos_d = table.get_pos(self.0);
            let name = &table.get_file_data(pos_d.file).name;

            let (lines, pos, linum) = Self::get_lines(table, pos_d);
            let mut buf = name.to_string();

            let Some(l) = lines.first() else {
                let _ = write!(buf, ": {}", err_msg.as_ref());
                return buf;
            };
            let linum_text = format!("{} ", linum);
            let linum_space: String = " ".repeat(linum_text.len());
            let mark: String = "^".repeat(cmp::min(
                pos_d.end - pos_d.start,
                l.len().saturating_sub(pos_d.start - pos),
            ));
            let space: String = " ".repeat(pos_d.start - pos);
            let _ = writeln!(buf);
            let _ = writeln!(buf, "{}|{}", linum_text, l);
            let _ = write!(
                buf,
                "{}|{}{} {}",
                linum_space,
                space,
                mark,
                err_msg.as_ref()
            );
            buf
        })
    }

    /// File name and span of this position.
    pub fn get_location(&self) -> (String, usize, usize) {
        GlobalPositionTable::read(|table| {
            let pos_d = table.get_pos(self.0);
            let name = table.get_file_data(pos_d.file).name.clone();
            (name, pos_d.start, pos_d.end)
        })
    }

    /// Line number of the start of this position. Line numbers start at 1.
    pub fn line(&self) -> usize {
        GlobalPositionTable::read(|table| {
            let pos_d = table.get_pos(self.0);
            Self::get_lines(table, pos_d).2
        })
    }
}

/// An IR node that may contain position information.
pub trait WithPos {
    /// Copy the span associated with this node.
    fn copy_span(&self) -> GPosIdx;
}

impl WithPos for GPosIdx {
    fn copy_span(&self) -> GPosIdx {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_position_has_no_option() {
        assert_eq!(GPosIdx::UNKNOWN.into_option(), None);
        assert_eq!(GPosIdx::default(), GPosIdx::UNKNOWN);
    }

    #[test]
    fn format_marks_the_span() {
        let file = GlobalPositionTable::add_file(
            "rv32i.isa".to_string(),
            "instruction ADD =\n  X(rd) := X(rs1) + X(rs2)\n".to_string(),
        );
        // `X(rd)` on the second line
        let pos = GlobalPositionTable::add_pos(file, 20, 25);
        assert_eq!(pos.line(), 2);
        let msg = pos.format("bad write");
        assert!(msg.starts_with("rv32i.isa\n"));
        assert!(msg.contains("2 |  X(rd) := X(rs1) + X(rs2)"));
        assert!(msg.ends_with("^^^^^ bad write"));
        let (name, start, end) = pos.get_location();
        assert_eq!((name.as_str(), start, end), ("rv32i.isa", 20, 25));
    }
}

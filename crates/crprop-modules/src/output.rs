//! Terminal modules that record candidates.
//!
//! Output modules see candidates from many worker threads at once, so every
//! buffer they own sits behind a `Mutex`.

use std::fmt;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

use crprop_core::units::{EEV, MPC};
use crprop_core::{Candidate, ConfigError, ModuleError, ParticleState};
use crprop_module::{Module, ProcessContext};
use log::{debug, warn};

// ── ParticleCollector ──────────────────────────────────────────────

/// Keeps copies of the candidates it processes, up to a fixed limit.
///
/// Stored copies carry no secondaries. Candidates arriving once the limit
/// is reached are counted in [`dropped`](Self::dropped) and discarded.
#[derive(Debug)]
pub struct ParticleCollector {
    limit: usize,
    stored: Mutex<Collected>,
}

#[derive(Debug, Default)]
struct Collected {
    candidates: Vec<Candidate>,
    dropped: usize,
}

impl ParticleCollector {
    /// Collector holding at most `limit` candidates.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            stored: Mutex::new(Collected {
                candidates: Vec::with_capacity(limit.min(1 << 16)),
                dropped: 0,
            }),
        }
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, Collected> {
        self.stored.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Maximum number of stored candidates.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of stored candidates.
    pub fn len(&self) -> usize {
        self.guard().candidates.len()
    }

    /// Whether nothing was stored.
    pub fn is_empty(&self) -> bool {
        self.guard().candidates.is_empty()
    }

    /// Candidates discarded because the collector was full.
    pub fn dropped(&self) -> usize {
        self.guard().dropped
    }

    /// Copy of the stored candidate at `index`.
    pub fn get(&self, index: usize) -> Option<Candidate> {
        self.guard().candidates.get(index).cloned()
    }

    /// Copies of all stored candidates in arrival order.
    pub fn candidates(&self) -> Vec<Candidate> {
        self.guard().candidates.clone()
    }

    /// Remove everything.
    pub fn clear(&self) {
        let mut stored = self.guard();
        stored.candidates.clear();
        stored.dropped = 0;
    }

    /// Feed a copy of every stored candidate through `module`, in order.
    ///
    /// Stops at the first error.
    pub fn reprocess(&self, module: &dyn Module, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let candidates = self.candidates();
        module.begin_run();
        let result = candidates.into_iter().try_for_each(|mut c| module.process(&mut c, ctx));
        module.end_run();
        result
    }
}

impl Module for ParticleCollector {
    fn name(&self) -> &str {
        "ParticleCollector"
    }

    fn describe(&self) -> String {
        format!("ParticleCollector: limit {}", self.limit)
    }

    fn process(&self, c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let mut stored = self
            .stored
            .lock()
            .map_err(|_| ModuleError::Output { reason: "collector lock poisoned".into() })?;
        if stored.candidates.len() < self.limit {
            stored.candidates.push(c.snapshot());
        } else {
            if stored.dropped == 0 {
                warn!("ParticleCollector full at {} candidates, dropping further ones", self.limit);
            }
            stored.dropped += 1;
        }
        Ok(())
    }
}

// ── TextOutput ─────────────────────────────────────────────────────

/// One selectable group of output columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Column {
    /// Trajectory length `D`.
    TrajectoryLength,
    /// Redshift `z`.
    Redshift,
    /// Serial numbers `SN`, `SN0` and `SN1`.
    SerialNumber,
    /// Current particle id `ID`.
    CurrentId,
    /// Current energy `E`.
    CurrentEnergy,
    /// Current position `X Y Z`.
    CurrentPosition,
    /// Current direction `Px Py Pz`.
    CurrentDirection,
    /// Source particle id `ID0`.
    SourceId,
    /// Source energy `E0`.
    SourceEnergy,
    /// Source position `X0 Y0 Z0`.
    SourcePosition,
    /// Source direction `P0x P0y P0z`.
    SourceDirection,
    /// Particle id at creation `ID1`.
    CreatedId,
    /// Energy at creation `E1`.
    CreatedEnergy,
    /// Position at creation `X1 Y1 Z1`.
    CreatedPosition,
    /// Direction at creation `P1x P1y P1z`.
    CreatedDirection,
    /// Statistical weight `W`.
    Weight,
}

impl Column {
    /// All columns.
    pub const ALL: [Column; 16] = [
        Column::TrajectoryLength,
        Column::Redshift,
        Column::SerialNumber,
        Column::CurrentId,
        Column::CurrentEnergy,
        Column::CurrentPosition,
        Column::CurrentDirection,
        Column::SourceId,
        Column::SourceEnergy,
        Column::SourcePosition,
        Column::SourceDirection,
        Column::CreatedId,
        Column::CreatedEnergy,
        Column::CreatedPosition,
        Column::CreatedDirection,
        Column::Weight,
    ];

    fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// Set of [`Column`]s.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Columns(u16);

impl Columns {
    /// No columns.
    pub const fn none() -> Self {
        Self(0)
    }

    /// Every column.
    pub fn all() -> Self {
        Column::ALL.iter().fold(Self::none(), |set, &c| set.with(c))
    }

    /// This set plus `column`.
    pub fn with(self, column: Column) -> Self {
        Self(self.0 | column.bit())
    }

    /// This set minus `column`.
    pub fn without(self, column: Column) -> Self {
        Self(self.0 & !column.bit())
    }

    /// Whether `column` is selected.
    pub fn contains(self, column: Column) -> bool {
        self.0 & column.bit() != 0
    }

    /// Whether no column is selected.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<Column> for Columns {
    fn from_iter<I: IntoIterator<Item = Column>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), Self::with)
    }
}

/// Column presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputType {
    /// `X ID E`, one-dimensional.
    Trajectory1D,
    /// `D ID E ID0 E0`, one-dimensional.
    Event1D,
    /// `D ID E X Y Z Px Py Pz`.
    Trajectory3D,
    /// `D ID E X Y Z Px Py Pz ID0 E0 X0 Y0 Z0`.
    Event3D,
    /// Every column.
    Everything,
}

impl OutputType {
    /// Selected columns.
    pub fn columns(self) -> Columns {
        use Column::*;
        match self {
            OutputType::Trajectory1D => [CurrentPosition, CurrentId, CurrentEnergy].into_iter().collect(),
            OutputType::Event1D => [TrajectoryLength, CurrentId, CurrentEnergy, SourceId, SourceEnergy]
                .into_iter()
                .collect(),
            OutputType::Trajectory3D => [TrajectoryLength, CurrentId, CurrentEnergy, CurrentPosition, CurrentDirection]
                .into_iter()
                .collect(),
            OutputType::Event3D => [
                TrajectoryLength,
                CurrentId,
                CurrentEnergy,
                CurrentPosition,
                CurrentDirection,
                SourceId,
                SourceEnergy,
                SourcePosition,
            ]
            .into_iter()
            .collect(),
            OutputType::Everything => Columns::all(),
        }
    }

    /// Whether positions are written as the `x` component only.
    pub fn one_dimensional(self) -> bool {
        matches!(self, OutputType::Trajectory1D | OutputType::Event1D)
    }
}

struct Sink {
    writer: Box<dyn Write + Send>,
    count: u64,
}

/// Writes one tab-separated line per processed candidate.
///
/// A commented header naming the columns is written before the first row.
/// Energies are divided by the energy scale (default EeV) and lengths by
/// the length scale (default Mpc).
pub struct TextOutput {
    columns: Columns,
    one_dimensional: bool,
    energy_scale: f64,
    length_scale: f64,
    sink: Mutex<Sink>,
}

impl fmt::Debug for TextOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextOutput")
            .field("columns", &self.columns)
            .field("one_dimensional", &self.one_dimensional)
            .field("energy_scale", &self.energy_scale)
            .field("length_scale", &self.length_scale)
            .finish_non_exhaustive()
    }
}

impl TextOutput {
    /// Start building an output writing to `writer`.
    pub fn builder(writer: impl Write + Send + 'static) -> TextOutputBuilder {
        TextOutputBuilder {
            writer: Box::new(writer),
            columns: OutputType::Everything.columns(),
            one_dimensional: false,
            energy_scale: EEV,
            length_scale: MPC,
        }
    }

    /// Selected columns.
    pub fn columns(&self) -> Columns {
        self.columns
    }

    /// Rows written so far.
    pub fn count(&self) -> u64 {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner).count
    }

    fn header(&self) -> String {
        let cols = self.columns;
        let one_d = self.one_dimensional;
        let mut h = String::from("#");
        let mut push = |on: bool, text: &str| {
            if on {
                h.push_str(text);
            }
        };
        push(cols.contains(Column::TrajectoryLength), "\tD");
        push(cols.contains(Column::Redshift), "\tz");
        push(cols.contains(Column::SerialNumber), "\tSN");
        push(cols.contains(Column::CurrentId), "\tID");
        push(cols.contains(Column::CurrentEnergy), "\tE");
        push(cols.contains(Column::CurrentPosition), if one_d { "\tX" } else { "\tX\tY\tZ" });
        push(cols.contains(Column::CurrentDirection) && !one_d, "\tPx\tPy\tPz");
        push(cols.contains(Column::SerialNumber), "\tSN0");
        push(cols.contains(Column::SourceId), "\tID0");
        push(cols.contains(Column::SourceEnergy), "\tE0");
        push(cols.contains(Column::SourcePosition), if one_d { "\tX0" } else { "\tX0\tY0\tZ0" });
        push(cols.contains(Column::SourceDirection) && !one_d, "\tP0x\tP0y\tP0z");
        push(cols.contains(Column::SerialNumber), "\tSN1");
        push(cols.contains(Column::CreatedId), "\tID1");
        push(cols.contains(Column::CreatedEnergy), "\tE1");
        push(cols.contains(Column::CreatedPosition), if one_d { "\tX1" } else { "\tX1\tY1\tZ1" });
        push(cols.contains(Column::CreatedDirection) && !one_d, "\tP1x\tP1y\tP1z");
        push(cols.contains(Column::Weight), "\tW");
        h.push_str("\n#\n");

        let any = |list: [Column; 3]| list.iter().any(|&c| cols.contains(c));
        if cols.contains(Column::TrajectoryLength) {
            h.push_str(&format!("# D             Trajectory length [{} Mpc]\n", self.length_scale / MPC));
        }
        if cols.contains(Column::Redshift) {
            h.push_str("# z             Redshift\n");
        }
        if cols.contains(Column::SerialNumber) {
            h.push_str("# SN/SN0/SN1    Serial number, unique within this run\n");
        }
        if any([Column::CurrentId, Column::SourceId, Column::CreatedId]) {
            h.push_str("# ID/ID0/ID1    Particle type (PDG numbering)\n");
        }
        if any([Column::CurrentEnergy, Column::SourceEnergy, Column::CreatedEnergy]) {
            h.push_str(&format!("# E/E0/E1       Energy [{} EeV]\n", self.energy_scale / EEV));
        }
        if any([Column::CurrentPosition, Column::SourcePosition, Column::CreatedPosition]) {
            h.push_str(&format!("# X/X0/X1...    Position [{} Mpc]\n", self.length_scale / MPC));
        }
        if any([Column::CurrentDirection, Column::SourceDirection, Column::CreatedDirection]) {
            h.push_str("# Px/P0x/P1x... Heading (unit vector of momentum)\n");
        }
        if cols.contains(Column::Weight) {
            h.push_str("# W             Statistical weight\n");
        }
        h.push_str("# no index = current, 0 = at source, 1 = at point of creation\n#\n");
        h
    }

    fn row(&self, c: &Candidate) -> String {
        let cols = self.columns;
        let mut fields: Vec<String> = Vec::with_capacity(32);
        if cols.contains(Column::TrajectoryLength) {
            fields.push(format!("{:.5}", c.trajectory_length() / self.length_scale));
        }
        if cols.contains(Column::Redshift) {
            fields.push(format!("{:.5}", c.redshift()));
        }
        let snapshots: [(&ParticleState, u64, [Column; 4]); 3] = [
            (
                &c.current,
                c.serial_number(),
                [Column::CurrentId, Column::CurrentEnergy, Column::CurrentPosition, Column::CurrentDirection],
            ),
            (
                &c.source,
                c.source_serial_number(),
                [Column::SourceId, Column::SourceEnergy, Column::SourcePosition, Column::SourceDirection],
            ),
            (
                &c.created,
                c.created_serial_number(),
                [Column::CreatedId, Column::CreatedEnergy, Column::CreatedPosition, Column::CreatedDirection],
            ),
        ];
        for (state, serial, [id, energy, position, direction]) in snapshots {
            if cols.contains(Column::SerialNumber) {
                fields.push(serial.to_string());
            }
            if cols.contains(id) {
                fields.push(state.id().to_string());
            }
            if cols.contains(energy) {
                fields.push(format!("{:.5}", state.energy() / self.energy_scale));
            }
            if cols.contains(position) {
                let p = state.position() / self.length_scale;
                if self.one_dimensional {
                    fields.push(format!("{:.5}", p.x));
                } else {
                    fields.extend(p.iter().map(|v| format!("{v:.5}")));
                }
            }
            if cols.contains(direction) && !self.one_dimensional {
                fields.extend(state.direction().iter().map(|v| format!("{v:.5}")));
            }
        }
        if cols.contains(Column::Weight) {
            fields.push(format!("{:.5}", c.weight()));
        }
        let mut line = fields.join("\t");
        line.push('\n');
        line
    }
}

impl Module for TextOutput {
    fn name(&self) -> &str {
        "TextOutput"
    }

    fn describe(&self) -> String {
        format!("TextOutput: {}", self.header().lines().next().unwrap_or("#").trim_start_matches('#').trim())
    }

    fn process(&self, c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        if self.columns.is_empty() {
            return Ok(());
        }
        let line = self.row(c);
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| ModuleError::Output { reason: "writer lock poisoned".into() })?;
        if sink.count == 0 {
            let header = self.header();
            sink.writer.write_all(header.as_bytes()).map_err(io_error)?;
        }
        sink.writer.write_all(line.as_bytes()).map_err(io_error)?;
        sink.count += 1;
        Ok(())
    }

    fn end_run(&self) {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        match sink.writer.flush() {
            Ok(()) => debug!("TextOutput flushed after {} rows", sink.count),
            Err(e) => warn!("TextOutput flush failed: {e}"),
        }
    }
}

fn io_error(e: std::io::Error) -> ModuleError {
    ModuleError::Output { reason: e.to_string() }
}

/// Builder for [`TextOutput`].
pub struct TextOutputBuilder {
    writer: Box<dyn Write + Send>,
    columns: Columns,
    one_dimensional: bool,
    energy_scale: f64,
    length_scale: f64,
}

impl TextOutputBuilder {
    /// Use a preset column set. Also sets the one-dimensional switch.
    pub fn output_type(mut self, kind: OutputType) -> Self {
        self.columns = kind.columns();
        self.one_dimensional = kind.one_dimensional();
        self
    }

    /// Use an explicit column set.
    pub fn columns(mut self, columns: Columns) -> Self {
        self.columns = columns;
        self
    }

    /// Add one column.
    pub fn enable(mut self, column: Column) -> Self {
        self.columns = self.columns.with(column);
        self
    }

    /// Remove one column.
    pub fn disable(mut self, column: Column) -> Self {
        self.columns = self.columns.without(column);
        self
    }

    /// Write only the `x` component of positions and no directions.
    pub fn one_dimensional(mut self, one_dimensional: bool) -> Self {
        self.one_dimensional = one_dimensional;
        self
    }

    /// Energy unit of the energy columns. Default: EeV.
    pub fn energy_scale(mut self, scale: f64) -> Self {
        self.energy_scale = scale;
        self
    }

    /// Length unit of the length and position columns. Default: Mpc.
    pub fn length_scale(mut self, scale: f64) -> Self {
        self.length_scale = scale;
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<TextOutput, ConfigError> {
        for (parameter, value) in [("energy_scale", self.energy_scale), ("length_scale", self.length_scale)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidParameter {
                    module: "TextOutput",
                    parameter,
                    reason: format!("must be finite and > 0, got {value}"),
                });
            }
        }
        Ok(TextOutput {
            columns: self.columns,
            one_dimensional: self.one_dimensional,
            energy_scale: self.energy_scale,
            length_scale: self.length_scale,
            sink: Mutex::new(Sink { writer: self.writer, count: 0 }),
        })
    }
}

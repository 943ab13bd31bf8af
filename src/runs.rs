use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Day an observation run was taken, stored as `YYYYMMDD`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ObservationDate(u32);

impl ObservationDate {
    /// # Errors
    /// Returns [`Error::InvalidDate`] unless `yyyymmdd` has eight digits with a month in `1..=12`
    /// and a day in `1..=31`.
    pub fn new(yyyymmdd: u32) -> Result<Self> {
        let date = Self(yyyymmdd);
        let valid = (10_000_101..=99_991_231).contains(&yyyymmdd)
            && (1..=12).contains(&date.month())
            && (1..=31).contains(&date.day());
        if valid {
            Ok(date)
        } else {
            Err(Error::InvalidDate(yyyymmdd.to_string()))
        }
    }

    pub const fn year(self) -> u32 {
        self.0 / 10_000
    }

    pub const fn month(self) -> u32 {
        self.0 / 100 % 100
    }

    pub const fn day(self) -> u32 {
        self.0 % 100
    }
}

impl TryFrom<u32> for ObservationDate {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ObservationDate> for u32 {
    fn from(date: ObservationDate) -> Self {
        date.0
    }
}

impl FromStr for ObservationDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u32>()
            .map_err(|_| Error::InvalidDate(s.to_owned()))
            .and_then(Self::new)
    }
}

impl fmt::Display for ObservationDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observation runs indexed by the date they were taken
///
/// Runs are kept in the order they were added, so the runs of a date come back in the order they
/// were recorded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunDataset {
    entries: Vec<(ObservationDate, RunId)>,
}

/// One line of the flat csv form
#[derive(Deserialize, Serialize)]
struct Row {
    date: ObservationDate,
    run: RunId,
}

impl RunDataset {
    pub const fn new() -> Self {
        Self { entries: vec![] }
    }

    /// Build from the runs of each date, e.g. `[(20201120, [2965, 2966]), (20210904, [6044])]`
    pub fn from_grouped<G, R>(groups: G) -> Self
    where
        G: IntoIterator<Item = (ObservationDate, R)>,
        R: IntoIterator<Item = RunId>,
    {
        let entries = groups
            .into_iter()
            .flat_map(|(date, runs)| runs.into_iter().map(move |run| (date, run)))
            .collect();
        Self { entries }
    }

    /// Build from a flat list of runs, each paired with its date
    pub fn from_pairs<P: IntoIterator<Item = (RunId, ObservationDate)>>(pairs: P) -> Self {
        let entries = pairs.into_iter().map(|(run, date)| (date, run)).collect();
        Self { entries }
    }

    pub fn push(&mut self, date: ObservationDate, run: RunId) {
        self.entries.push((date, run));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObservationDate, RunId)> + '_ {
        self.entries.iter().copied()
    }

    pub fn runs_for_date(&self, date: ObservationDate) -> Vec<RunId> {
        self.entries
            .iter()
            .filter(|(d, _)| *d == date)
            .map(|(_, run)| *run)
            .collect()
    }

    /// The date of the first entry recorded for `run`
    pub fn date_for_run(&self, run: RunId) -> Option<ObservationDate> {
        self.entries
            .iter()
            .find(|(_, r)| *r == run)
            .map(|(date, _)| *date)
    }

    /// Every distinct date, earliest first
    pub fn dates(&self) -> Vec<ObservationDate> {
        self.entries
            .iter()
            .map(|(date, _)| *date)
            .sorted()
            .dedup()
            .collect()
    }

    /// Every distinct run id, in ascending order
    pub fn runs(&self) -> Vec<RunId> {
        self.entries
            .iter()
            .map(|(_, run)| *run)
            .sorted()
            .dedup()
            .collect()
    }

    pub fn to_mapping(&self) -> BTreeMap<ObservationDate, Vec<RunId>> {
        let mut mapping: BTreeMap<ObservationDate, Vec<RunId>> = BTreeMap::new();
        for (date, run) in &self.entries {
            mapping.entry(*date).or_default().push(*run);
        }
        mapping
    }

    /// Read a dataset from a toml file whose keys are dates and whose values are run ids
    ///
    /// ```toml
    /// 20201120 = [2965, 2966]
    /// 20210904 = [6044]
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file is missing or malformed, or if a key is not a valid date.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        let raw: BTreeMap<String, Vec<RunId>> = toml::from_str(&contents)?;

        let groups = raw
            .into_iter()
            .map(|(date, runs)| Ok((date.parse::<ObservationDate>()?, runs)))
            .collect::<Result<Vec<_>>>()?;
        let dataset = Self::from_grouped(groups);
        debug!(?path, runs = dataset.len(), "loaded run dataset");
        Ok(dataset)
    }

    /// Write the dataset in the toml form read by [`RunDataset::load`]
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw: BTreeMap<String, Vec<RunId>> = self
            .to_mapping()
            .into_iter()
            .map(|(date, runs)| (date.to_string(), runs))
            .collect();
        fs::write(path, toml::to_string(&raw)?)?;
        debug!(?path, dates = raw.len(), runs = self.len(), "saved run dataset");
        Ok(())
    }

    /// Read the flat form: a csv file with a `date,run` header and one run per row
    ///
    /// # Errors
    /// Returns an error if the file is missing, or a row is malformed or holds an invalid date.
    pub fn read_csv(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)?;

        let mut dataset = Self::new();
        for result in rdr.deserialize() {
            let row: Row = result?;
            dataset.push(row.date, row.run);
        }
        debug!(?path, runs = dataset.len(), "read run dataset from csv");
        Ok(dataset)
    }

    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        for (date, run) in &self.entries {
            wtr.serialize(Row {
                date: *date,
                run: *run,
            })?;
        }
        wtr.flush()?;
        debug!(?path, runs = self.len(), "wrote run dataset to csv");
        Ok(())
    }
}

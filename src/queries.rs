//! Common ISOTROPY queries
//!
//! Each query is a short, fixed call sequence over a [`Session`]: set a few
//! values, request a few shows, run one or more displays and pick fields out
//! of the records. [`QueryClient`] opens a fresh session per query; the
//! `*_in` functions reuse a session the caller already holds.
//!
//! Every query accepts a [`SessionOptions`] whose values and shows are added
//! on top of the query's own (values override) and whose settings select
//! the notation.

use std::time::Duration;

use futures::future::BoxFuture;
use indexmap::IndexMap;

use crate::config::{Config, ProtocolConfig};
use crate::engine::{Launcher, ProcessLauncher};
use crate::error::{Error, Result};
use crate::notation::{matrix_to_iso_string, vector_to_iso_string};
use crate::parser::{Record, Value};
use crate::session::{with_session, Session, SessionOptions};

/// Lattice parameters used when the caller only cares about the shape of
/// the Cartesian matrices
pub const UNIT_LATTICE: &str = "1 1 1 90 90 90";

/// Denominator bound for origins
pub const ORIGIN_MAX_DENOMINATOR: u64 = 10;

/// Tolerance when comparing basis vectors and origins
pub const BASIS_TOLERANCE: f64 = 1e-5;

const DIRECTION_DELAY: Duration = Duration::from_millis(100);
const KVALUE_DELAY: Duration = Duration::from_secs(1);
const ORDER_PARAMETER_SHOWS: [&str; 4] = ["IRREP", "DIRECTION", "BASIS", "ORIGIN"];

fn field<'a>(record: &'a Record, name: &str) -> Result<&'a Value> {
    record.get(name).ok_or_else(|| Error::MissingField {
        field: name.to_string(),
    })
}

/// Irrep column names, most specific first; short labels such as `R4-`
/// leave the space in `Irrep (ML)` blank, which splits the header
const IRREP_FIELDS: [&str; 2] = ["Irrep (ML)", "Irrep"];

fn irrep_field(record: &Record) -> Result<&Value> {
    IRREP_FIELDS
        .iter()
        .find_map(|name| record.get(*name))
        .ok_or_else(|| Error::MissingField {
            field: IRREP_FIELDS[0].to_string(),
        })
}

fn first_record(records: Vec<Record>, display: &str) -> Result<Record> {
    records
        .into_iter()
        .next()
        .ok_or_else(|| Error::UnexpectedShape {
            expected: format!("at least one record from DISPLAY {}", display),
            found: "no records".to_string(),
        })
}

fn atom_text(value: &Value) -> String {
    match value.as_atom() {
        Some(text) => text.to_string(),
        None => value.flatten_atoms().join(" "),
    }
}

/// `KVALUE` argument: the parameter count followed by the parameters
fn kvalue(k_params: &[String]) -> String {
    std::iter::once(k_params.len().to_string())
        .chain(k_params.iter().cloned())
        .collect::<Vec<_>>()
        .join(",")
}

/// Whether a k vector contains free parameters (anything not numeric)
pub fn kpoint_has_parameters(k_vector: &Value) -> bool {
    k_vector.to_f64_vec().is_err()
}

/// Split an `Elements` cell into individual symmetry elements
///
/// One element prints as `(C2x|0,0,0)` and decomposes to a label followed by
/// its translation. Several elements form a list of those, and elements
/// continued onto further rows add one more level of nesting per row.
pub fn element_list(elements: &Value) -> Vec<Value> {
    fn is_single(items: &[Value]) -> bool {
        items.first().is_some_and(|first| !first.is_list())
            && items.iter().skip(1).any(Value::is_list)
    }

    fn collect(value: &Value, out: &mut Vec<Value>) {
        match value {
            Value::List(items) if is_single(items) => out.push(value.clone()),
            Value::List(items) => items.iter().for_each(|item| collect(item, out)),
            atom => out.push(atom.clone()),
        }
    }

    let mut out = Vec::new();
    collect(elements, &mut out);
    out
}

/// `VALUE ELEMENT` argument for one element, e.g. `C2x 0 0 0`
pub fn element_argument(element: &Value) -> String {
    element.flatten_atoms().join(" ")
}

/// All `k`-element combinations of `items`, in lexicographic index order
pub fn combinations<T: Clone>(items: &[T], k: usize) -> Vec<Vec<T>> {
    let n = items.len();
    if k > n {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut indices: Vec<usize> = (0..k).collect();
    loop {
        out.push(indices.iter().map(|&i| items[i].clone()).collect());

        let Some(pivot) = (0..k).rev().find(|&i| indices[i] != i + n - k) else {
            return out;
        };
        indices[pivot] += 1;
        for j in pivot + 1..k {
            indices[j] = indices[j - 1] + 1;
        }
    }
}

fn rows_close(a: &[f64], b: &[f64], tolerance: f64) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < tolerance)
}

/// Whether `candidate` is `basis` with its rows reordered
pub fn is_row_permutation<A, B>(basis: &[A], candidate: &[B], tolerance: f64) -> bool
where
    A: AsRef<[f64]>,
    B: AsRef<[f64]>,
{
    fn assign<A: AsRef<[f64]>, B: AsRef<[f64]>>(
        basis: &[A],
        candidate: &[B],
        row: usize,
        used: &mut [bool],
        tolerance: f64,
    ) -> bool {
        if row == candidate.len() {
            return true;
        }
        for i in 0..basis.len() {
            if used[i] || !rows_close(basis[i].as_ref(), candidate[row].as_ref(), tolerance) {
                continue;
            }
            used[i] = true;
            if assign(basis, candidate, row + 1, used, tolerance) {
                return true;
            }
            used[i] = false;
        }
        false
    }

    basis.len() == candidate.len()
        && assign(basis, candidate, 0, &mut vec![false; basis.len()], tolerance)
}

fn reduce_origin(origin: &[f64]) -> Vec<f64> {
    origin.iter().map(|x| x.rem_euclid(1.0)).collect()
}

/// Keep the order parameters whose `Basis Vectors` are a row permutation of
/// `basis` and whose `Origin` equals `origin` (reduced into `[0, 1)`)
pub fn filter_by_basis<R: AsRef<[f64]>>(
    candidates: Vec<Record>,
    basis: &[R],
    origin: &[f64],
) -> Vec<Record> {
    let origin = reduce_origin(origin);
    candidates
        .into_iter()
        .filter(|record| {
            let parsed = field(record, "Basis Vectors")
                .and_then(Value::to_f64_matrix)
                .and_then(|b| Ok((b, field(record, "Origin")?.to_f64_vec()?)));
            match parsed {
                Ok((candidate_basis, candidate_origin)) => {
                    rows_close(&reduce_origin(&candidate_origin), &origin, BASIS_TOLERANCE)
                        && is_row_permutation(basis, &candidate_basis, BASIS_TOLERANCE)
                }
                Err(e) => {
                    debug!("skipping order parameter without numeric basis: {}", e);
                    false
                }
            }
        })
        .collect()
}

/// Isotropy subgroup search for one irrep, optionally along a direction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainQuery {
    pub parent: String,
    pub irrep: String,
    pub direction: Option<String>,
    /// Values for the free parameters of the irrep's k point
    pub k_params: Option<Vec<String>>,
}

impl DomainQuery {
    pub fn new(parent: impl Into<String>, irrep: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            irrep: irrep.into(),
            ..Self::default()
        }
    }

    pub fn direction(mut self, direction: impl Into<String>) -> Self {
        self.direction = Some(direction.into());
        self
    }

    pub fn k_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.k_params = Some(params.into_iter().map(Into::into).collect());
        self
    }

    fn values(&self) -> Vec<(String, String)> {
        let mut values = vec![
            ("PARENT".to_string(), self.parent.clone()),
            ("IRREP".to_string(), self.irrep.clone()),
        ];
        if let Some(k_params) = &self.k_params {
            values.push(("KVALUE".to_string(), kvalue(k_params)));
        }
        if let Some(direction) = &self.direction {
            values.push(("DIRECTION".to_string(), direction.clone()));
        }
        values
    }

    fn shows() -> [&'static str; 4] {
        ["DIRECTION VECTOR", "DOMAINS", "SUBGROUP", "DISTINCT"]
    }

    fn delay(&self) -> Option<Duration> {
        self.k_params.as_ref().map(|_| KVALUE_DELAY)
    }
}

/// Displacive distortion of the given Wyckoff positions under one irrep
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistortionQuery {
    pub parent: String,
    pub wyckoffs: Vec<String>,
    pub irrep: String,
    pub direction: Option<String>,
    /// Supercell basis, one row per lattice vector
    pub cell: Option<Vec<Vec<f64>>>,
    pub k_params: Option<Vec<String>>,
    pub domain: Option<u32>,
}

impl DistortionQuery {
    pub fn new<I, S>(parent: impl Into<String>, wyckoffs: I, irrep: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parent: parent.into(),
            wyckoffs: wyckoffs.into_iter().map(Into::into).collect(),
            irrep: irrep.into(),
            ..Self::default()
        }
    }

    pub fn direction(mut self, direction: impl Into<String>) -> Self {
        self.direction = Some(direction.into());
        self
    }

    pub fn cell(mut self, cell: Vec<Vec<f64>>) -> Self {
        self.cell = Some(cell);
        self
    }

    pub fn k_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.k_params = Some(params.into_iter().map(Into::into).collect());
        self
    }

    pub fn domain(mut self, domain: u32) -> Self {
        self.domain = Some(domain);
        self
    }

    fn values(&self) -> Vec<(String, String)> {
        let mut values = vec![
            ("PARENT".to_string(), self.parent.clone()),
            ("WYCKOFF".to_string(), self.wyckoffs.join(" ")),
            ("IRREP".to_string(), self.irrep.clone()),
        ];
        if let Some(direction) = &self.direction {
            values.push(("DIRECTION".to_string(), direction.clone()));
        }
        if let Some(cell) = &self.cell {
            values.push(("CELL".to_string(), matrix_to_iso_string(cell)));
        }
        if let Some(domain) = self.domain {
            values.push(("DOMAIN".to_string(), domain.to_string()));
        }
        if let Some(k_params) = &self.k_params {
            values.push(("KVALUE".to_string(), kvalue(k_params)));
        }
        values
    }

    fn shows() -> [&'static str; 2] {
        ["WYCKOFF", "MICROSCOPIC VECTOR"]
    }
}

/// Run a domain search in an existing session
///
/// Values and shows are added to whatever the session already holds.
pub async fn domains_in<L: Launcher>(session: &mut Session<L>, query: &DomainQuery) -> Result<Vec<Record>> {
    session.update_shows(DomainQuery::shows()).await?;
    session.update_values(query.values()).await?;
    session.display("ISOTROPY", query.delay()).await
}

/// Compute a distortion in an existing session
///
/// A `KVALUE` set by the query is cancelled afterwards so it does not leak
/// into the caller's next display.
pub async fn distortion_in<L: Launcher>(
    session: &mut Session<L>,
    query: &DistortionQuery,
) -> Result<Vec<Record>> {
    session.update_values(query.values()).await?;
    session.update_shows(DistortionQuery::shows()).await?;
    let records = session.display("DISTORTION", None).await?;
    if session.values().contains_key("KVALUE") {
        session.delete_value("KVALUE").await?;
    }
    Ok(records)
}

/// Opens one session per query
#[derive(Debug, Clone)]
pub struct QueryClient<L> {
    launcher: L,
    protocol: ProtocolConfig,
    shutdown_grace: Duration,
}

impl QueryClient<ProcessLauncher> {
    /// Client for the real engine described by `config`
    pub fn from_config(config: &Config) -> Self {
        Self {
            launcher: ProcessLauncher::new(config.engine.clone()),
            protocol: config.protocol.clone(),
            shutdown_grace: Duration::from_millis(config.engine.shutdown_grace_ms),
        }
    }
}

impl<L: Launcher + Clone> QueryClient<L> {
    pub fn new(launcher: L, protocol: ProtocolConfig) -> Self {
        Self {
            launcher,
            protocol,
            shutdown_grace: SessionOptions::default().shutdown_grace,
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Query values and shows first, then the caller's additions
    fn options<V, S>(&self, values: V, shows: S, extra: SessionOptions) -> SessionOptions
    where
        V: IntoIterator<Item = (String, String)>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        SessionOptions {
            values: values.into_iter().chain(extra.values).collect(),
            shows: shows.into_iter().map(Into::into).chain(extra.shows).collect(),
            settings: extra.settings,
            shutdown_grace: self.shutdown_grace,
        }
    }

    async fn run<T, F>(&self, options: SessionOptions, f: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut Session<L>) -> BoxFuture<'a, Result<T>>,
    {
        with_session(self.launcher.clone(), self.protocol.clone(), options, f).await
    }

    /// Symmetry elements of a space group (`Elements` of `DISPLAY PARENT`)
    pub async fn symmetry_operations(&self, spacegroup: &str, extra: SessionOptions) -> Result<Value> {
        let options = self.options([("PARENT".to_string(), spacegroup.to_string())], ["ELEMENTS"], extra);
        let records = self
            .run(options, |session| {
                Box::pin(async move { session.display("PARENT", None).await })
            })
            .await?;
        let record = first_record(records, "PARENT")?;
        Ok(field(&record, "Elements")?.clone())
    }

    /// Symmetry elements with their Cartesian rotation matrices
    pub async fn symmetry_operations_with_matrix(
        &self,
        spacegroup: &str,
        lattice_parameters: Option<&str>,
        extra: SessionOptions,
    ) -> Result<Vec<Record>> {
        let options = self.options([("PARENT".to_string(), spacegroup.to_string())], ["ELEMENTS"], extra);
        let lattice = lattice_parameters.unwrap_or(UNIT_LATTICE).to_string();
        self.run(options, |session| {
            Box::pin(async move {
                session.set_value("LATTICE PARAMETER", lattice).await?;
                session.add_show("CARTESIAN").await?;
                session.display("PARENT", None).await
            })
        })
        .await
    }

    /// k points of a space group, label to k vector
    ///
    /// The label column has an empty header.
    pub async fn kpoints(&self, spacegroup: &str, extra: SessionOptions) -> Result<IndexMap<String, Value>> {
        let options = self.options([("PARENT".to_string(), spacegroup.to_string())], ["KPOINT"], extra);
        let records = self
            .run(options, |session| {
                Box::pin(async move { session.display("KPOINT", None).await })
            })
            .await?;

        records
            .iter()
            .map(|record| -> Result<(String, Value)> {
                let label = atom_text(field(record, "")?);
                Ok((label, field(record, "k vector")?.clone()))
            })
            .collect()
    }

    /// Irrep names of a space group, optionally at one k point
    pub async fn irreps(
        &self,
        spacegroup: &str,
        kpoint: Option<&str>,
        extra: SessionOptions,
    ) -> Result<Vec<String>> {
        let mut values = vec![("PARENT".to_string(), spacegroup.to_string())];
        if let Some(kpoint) = kpoint {
            values.push(("KPOINT".to_string(), kpoint.to_string()));
        }
        let options = self.options(values, ["IRREP"], extra);
        let records = self
            .run(options, |session| {
                Box::pin(async move { session.display("IRREP", None).await })
            })
            .await?;

        records
            .iter()
            .map(|record| irrep_field(record).map(atom_text))
            .collect()
    }

    /// Order-parameter directions compatible with a basis and origin
    ///
    /// `subgroup` defaults to `1` (P1), which admits every direction.
    pub async fn directions<R: AsRef<[f64]>>(
        &self,
        spacegroup: &str,
        basis: &[R],
        origin: &[f64],
        subgroup: Option<&str>,
        extra: SessionOptions,
    ) -> Result<Vec<Record>> {
        let values = vec![
            ("PARENT".to_string(), spacegroup.to_string()),
            ("SUBGROUP".to_string(), subgroup.unwrap_or("1").to_string()),
            ("BASIS".to_string(), matrix_to_iso_string(basis)),
            (
                "ORIGIN".to_string(),
                vector_to_iso_string(origin, ORIGIN_MAX_DENOMINATOR),
            ),
        ];
        let options = self.options(values, ["KPOINT"], extra);
        self.run(options, |session| {
            Box::pin(async move { session.display("DIRECTION", Some(DIRECTION_DELAY)).await })
        })
        .await
    }

    /// Representation matrices of each irrep at a k point, one per
    /// symmetry element
    ///
    /// Irreps default to all irreps at `kpoint`.
    pub async fn representations(
        &self,
        spacegroup: &str,
        kpoint: &str,
        irreps: Option<Vec<String>>,
        extra: SessionOptions,
    ) -> Result<IndexMap<String, Vec<Value>>> {
        let elements = element_list(&self.symmetry_operations(spacegroup, extra.clone()).await?);
        let irreps = match irreps {
            Some(irreps) if !irreps.is_empty() => irreps,
            _ => self.irreps(spacegroup, Some(kpoint), extra.clone()).await?,
        };

        let values = vec![
            ("PARENT".to_string(), spacegroup.to_string()),
            ("KPOINT".to_string(), kpoint.to_string()),
        ];
        let options = self.options(values, ["MATRIX"], extra);
        self.run(options, |session| {
            Box::pin(async move {
                let mut by_irrep = IndexMap::new();
                for irrep in irreps {
                    session.set_value("IRREP", irrep.as_str()).await?;
                    let mut matrices = Vec::with_capacity(elements.len());
                    for element in &elements {
                        session.set_value("ELEMENT", element_argument(element)).await?;
                        let record = first_record(session.display("IRREP", None).await?, "IRREP")?;
                        matrices.push(field(&record, "Matrix")?.clone());
                    }
                    by_irrep.insert(irrep, matrices);
                }
                Ok(by_irrep)
            })
        })
        .await
    }

    /// Isotropy subgroups (domains) of one irrep
    pub async fn domains(&self, query: &DomainQuery, extra: SessionOptions) -> Result<Vec<Record>> {
        let options = self.options(query.values(), DomainQuery::shows(), extra);
        let delay = query.delay();
        self.run(options, |session| {
            Box::pin(async move { session.display("ISOTROPY", delay).await })
        })
        .await
    }

    /// Displacements of Wyckoff positions under one irrep
    pub async fn distortion(&self, query: &DistortionQuery, extra: SessionOptions) -> Result<Vec<Record>> {
        let options = self.options(query.values(), DistortionQuery::shows(), extra);
        self.run(options, |session| {
            Box::pin(async move { session.display("DISTORTION", None).await })
        })
        .await
    }

    /// Single irreps that take `parent` to `subgroup`
    pub async fn single_irrep_order_parameters(
        &self,
        parent: &str,
        subgroup: &str,
        extra: SessionOptions,
    ) -> Result<Vec<Record>> {
        let values = vec![
            ("PARENT".to_string(), parent.to_string()),
            ("SUBGROUP".to_string(), subgroup.to_string()),
        ];
        let options = self.options(values, ORDER_PARAMETER_SHOWS, extra);
        self.run(options, |session| {
            Box::pin(async move { session.display("ISOTROPY", None).await })
        })
        .await
    }

    /// Coupled order parameters of every `n`-combination of irreps
    ///
    /// Irreps default to those at k points without free parameters. Each
    /// record is tagged with an `Irreps` list naming its combination. Long
    /// runs grow the engine's database until it bombs; the session's
    /// restart policy absorbs that.
    pub async fn coupled_irrep_order_parameters(
        &self,
        parent: &str,
        subgroup: Option<&str>,
        irreps: Option<Vec<String>>,
        n: usize,
        extra: SessionOptions,
    ) -> Result<Vec<Record>> {
        let irreps = match irreps {
            Some(irreps) => irreps,
            None => {
                let mut irreps = Vec::new();
                for (label, k_vector) in self.kpoints(parent, extra.clone()).await? {
                    if !kpoint_has_parameters(&k_vector) {
                        irreps.extend(self.irreps(parent, Some(&label), extra.clone()).await?);
                    }
                }
                irreps
            }
        };

        let mut values = vec![("PARENT".to_string(), parent.to_string())];
        if let Some(subgroup) = subgroup {
            values.push(("SUBGROUP".to_string(), subgroup.to_string()));
        }
        let options = self.options(values, ORDER_PARAMETER_SHOWS, extra);
        let combos = combinations(&irreps, n);
        self.run(options, |session| {
            Box::pin(async move {
                let mut found = Vec::new();
                for combo in combos {
                    info!("trying irrep combo {:?}", combo);
                    session.set_value("IRREP", combo.join(" ")).await?;
                    let mut records = session.display("ISOTROPY COUPLED", None).await?;
                    for record in &mut records {
                        record.insert("Irreps".to_string(), Value::atoms(combo.iter().cloned()));
                    }
                    debug!("parsed: {:?}", records);
                    found.extend(records);
                }
                Ok(found)
            })
        })
        .await
    }

    /// Single and coupled order parameters realising a known basis and origin
    pub async fn order_parameters_for_basis<R: AsRef<[f64]>>(
        &self,
        parent: &str,
        subgroup: &str,
        basis: &[R],
        origin: &[f64],
        coupled_order: usize,
    ) -> Result<Vec<Record>> {
        let mut candidates = self
            .single_irrep_order_parameters(parent, subgroup, SessionOptions::new())
            .await?;
        debug!("getting coupled irreps");
        candidates.extend(
            self.coupled_irrep_order_parameters(
                parent,
                Some(subgroup),
                None,
                coupled_order,
                SessionOptions::new(),
            )
            .await?,
        );
        Ok(filter_by_basis(candidates, basis, origin))
    }
}

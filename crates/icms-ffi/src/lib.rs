//! # ICMS FFI
//!
//! Python 綁定層（PyO3），以 JSON 字串進出

use pyo3::prelude::*;

pub mod python;

/// Python 模組註冊
#[pymodule]
fn icms_engine(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyCostingEngine>()?;
    m.add_class::<python::PyEngineConfig>()?;
    m.add_function(wrap_pyfunction!(python::init_logging, m)?)?;
    Ok(())
}

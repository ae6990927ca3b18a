//! YAML configuration loading.
//!
//! A run is described by two documents: the global settings (horizon, revenue
//! targets, month distribution) and the product catalog. Products are checked
//! while loading, so a missing or invalid parameter stops the run before any
//! template is built.

use crate::error::{PlannerError, Result};
use crate::schema::{
    catalog_from_input, GlobalConfig, PlannerConfig, ProductCatalog, ProductParametersInput,
};
use log::{debug, info};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub fn parse_yaml<T: DeserializeOwned>(contents: &str) -> Result<T> {
    Ok(serde_yaml::from_str(contents)?)
}

pub fn parse_global_config(contents: &str) -> Result<GlobalConfig> {
    let global: GlobalConfig = parse_yaml(contents)?;
    if global.horizonte_plan_consolidado == 0 {
        return Err(PlannerError::InvalidHorizon(global.horizonte_plan_consolidado));
    }
    Ok(global)
}

pub fn parse_products(contents: &str) -> Result<ProductCatalog> {
    let raw: BTreeMap<String, ProductParametersInput> = parse_yaml(contents)?;
    catalog_from_input(raw)
}

pub fn load_global_config(path: &Path) -> Result<GlobalConfig> {
    debug!("Reading global configuration from {}", path.display());
    parse_global_config(&fs::read_to_string(path)?)
}

pub fn load_products(path: &Path) -> Result<ProductCatalog> {
    debug!("Reading product catalog from {}", path.display());
    parse_products(&fs::read_to_string(path)?)
}

pub fn load_config(global_path: &Path, products_path: &Path) -> Result<PlannerConfig> {
    let global = load_global_config(global_path)?;
    let productos = load_products(products_path)?;

    info!(
        "Loaded configuration: horizon {} months, {} product categories",
        global.horizonte_plan_consolidado,
        productos.len()
    );

    Ok(PlannerConfig { global, productos })
}

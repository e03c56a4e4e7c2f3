//! Request and response bodies of `POST /predict`

use crate::error::{Result, ServerError};
use forecast_core::{ErrorMap, ForecastOutcome, ForecastParams};
use serde::Serialize;
use serde_json::{Map, Value};

const PERIODS_FIELD: &str = "n_periodos_compar";
const PERIODS_ALIAS: &str = "n_periodos";
const RATIO_FIELD: &str = "taxa_de_analise";
const DATA_FIELD: &str = "data";

/// Validated body of a forecast request
#[derive(Debug, Clone)]
pub struct PredictRequest {
    pub params: ForecastParams,
    pub records: Vec<Value>,
}

impl PredictRequest {
    /// Check required fields and their types
    pub fn from_value(body: Value) -> Result<Self> {
        let mut body = match body {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };

        let periods_key = if body.contains_key(PERIODS_FIELD) {
            PERIODS_FIELD
        } else {
            PERIODS_ALIAS
        };

        let missing: Vec<&str> = [
            (periods_key, PERIODS_FIELD),
            (RATIO_FIELD, RATIO_FIELD),
            (DATA_FIELD, DATA_FIELD),
        ]
        .into_iter()
        .filter(|(key, _)| !body.contains_key(*key))
        .map(|(_, name)| name)
        .collect();
        if !missing.is_empty() {
            return Err(ServerError::BadRequest(format!(
                "Campos obrigatórios ausentes: {}",
                missing.join(", ")
            )));
        }

        let records = match body.remove(DATA_FIELD) {
            Some(Value::Array(records)) if !records.is_empty() => records,
            _ => {
                return Err(ServerError::BadRequest(
                    "O campo \"data\" deve ser uma lista não vazia".to_string(),
                ))
            }
        };

        let n_periods = body.get(periods_key).and_then(as_integer).ok_or_else(|| {
            ServerError::BadRequest(format!("O campo \"{}\" deve ser um inteiro", PERIODS_FIELD))
        })?;
        let ratio = body.get(RATIO_FIELD).and_then(Value::as_f64).ok_or_else(|| {
            ServerError::BadRequest(format!("O campo \"{}\" deve ser um número", RATIO_FIELD))
        })?;

        Ok(Self {
            params: ForecastParams::new(n_periods, ratio)?,
            records,
        })
    }
}

/// Integers, including floats with no fractional part
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Successful forecast response
#[derive(Debug, Clone, Serialize)]
pub struct PredictResponse {
    pub taxa_de_erros_por_dimensao: ErrorMap,
    pub data: Vec<Value>,
}

impl From<&ForecastOutcome> for PredictResponse {
    fn from(outcome: &ForecastOutcome) -> Self {
        Self {
            taxa_de_erros_por_dimensao: outcome.errors.clone(),
            data: outcome.forecast.to_records(),
        }
    }
}

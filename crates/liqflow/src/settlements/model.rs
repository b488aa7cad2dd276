use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A driver's payroll record for one period, as served by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub id: String,
    #[serde(rename = "conductor", default)]
    pub driver: Option<Driver>,

    #[serde(rename = "fechaInicio")]
    pub period_start: NaiveDate,
    #[serde(rename = "fechaFin")]
    pub period_end: NaiveDate,

    #[serde(rename = "sueldoBasico", default)]
    pub base_salary: i64,
    #[serde(rename = "bonificaciones", default)]
    pub bonuses: Vec<LineItem>,
    #[serde(rename = "pernotes", default)]
    pub overnight_stays: Vec<LineItem>,
    #[serde(rename = "recargos", default)]
    pub surcharges: Vec<LineItem>,
    #[serde(rename = "vacaciones", default)]
    pub vacation_pay: i64,
    #[serde(rename = "anticipos", default)]
    pub advances: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: String,
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido", default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Driver {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    /// The email address, if present and not blank.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "concepto", default)]
    pub concept: String,
    #[serde(rename = "cantidad", default = "one")]
    pub quantity: u32,
    #[serde(rename = "valor")]
    pub value: i64,
}

fn one() -> u32 {
    1
}

impl LineItem {
    pub fn amount(&self) -> i64 {
        i64::from(self.quantity).saturating_mul(self.value)
    }
}

/// Roll-up of a settlement, in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SettlementTotals {
    pub base_salary: i64,
    pub bonuses: i64,
    pub overnight_stays: i64,
    pub surcharges: i64,
    pub vacation_pay: i64,
    pub gross: i64,
    pub advances: i64,
    pub net: i64,
}

fn sum(items: &[LineItem]) -> i64 {
    items.iter().map(LineItem::amount).fold(0, i64::saturating_add)
}

impl Settlement {
    pub fn display_name(&self) -> String {
        match &self.driver {
            Some(d) => d.display_name(),
            None => self.id.clone(),
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.driver.as_ref().and_then(Driver::email)
    }

    pub fn totals(&self) -> SettlementTotals {
        let bonuses = sum(&self.bonuses);
        let overnight_stays = sum(&self.overnight_stays);
        let surcharges = sum(&self.surcharges);
        let advances = sum(&self.advances);

        let gross = [
            self.base_salary,
            bonuses,
            overnight_stays,
            surcharges,
            self.vacation_pay,
        ]
        .into_iter()
        .fold(0, i64::saturating_add);

        SettlementTotals {
            base_salary: self.base_salary,
            bonuses,
            overnight_stays,
            surcharges,
            vacation_pay: self.vacation_pay,
            gross,
            advances,
            net: gross.saturating_sub(advances),
        }
    }
}

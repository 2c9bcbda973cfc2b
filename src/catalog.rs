//! Test-type catalog: which fields each test submission form asks for.

use crate::error::{Error, Result};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
        }
    }
}

#[derive(Debug)]
pub struct Field {
    pub id: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn text(id: &'static str, label: &'static str) -> Field {
    Field {
        id,
        label,
        kind: FieldKind::Text,
        required: true,
    }
}

const fn number(id: &'static str, label: &'static str) -> Field {
    Field {
        id,
        label,
        kind: FieldKind::Number,
        required: true,
    }
}

#[derive(Debug)]
pub struct TestType {
    pub name: &'static str,
    pub fields: &'static [Field],
}

pub static TEST_TYPES: &[TestType] = &[
    TestType {
        name: "SubDeactivation",
        fields: &[text("MDN", "MDN"), text("OpType", "Operation Type")],
    },
    TestType {
        name: "CreateSubscriber",
        fields: &[
            text("BEID", "BEID"),
            text("OperatorID", "Operator ID"),
            text("MDN", "MDN"),
            text("PayMode", "Pay Mode"),
        ],
    },
    TestType {
        name: "SubActivation",
        fields: &[
            text("BEID", "BEID"),
            text("OperatorID", "Operator ID"),
            text("MDN", "MDN"),
        ],
    },
    TestType {
        name: "ChangeSubInfo",
        fields: &[
            text("MDN", "MDN"),
            text("Code", "Code"),
            text("Value", "Value"),
        ],
    },
    TestType {
        name: "ChangeCL",
        fields: &[
            text("BEID", "BEID"),
            number("OperatorID", "OperatorID"),
            number("MDN", "MDN"),
            number("CustLevel", "CustLevel"),
        ],
    },
    TestType {
        name: "ChangeSubValidity",
        fields: &[
            text("MDN", "Subscriber ID"),
            text("OpType", "Operation Type"),
            text("ValidityIncrement", "Validity Number"),
        ],
    },
    TestType {
        name: "ChangeMP",
        fields: &[
            text("OperatorID", "Operator ID"),
            text("MDN", "MDN"),
            text("OfferingID", "Offering ID"),
        ],
    },
    TestType {
        name: "Starcode",
        fields: &[
            text("BEID", "BEID"),
            text("OperatorID", "Operator ID"),
            text("MDN", "MDN"),
            number("Amount", "Amount"),
            number("Starcode", "Star code"),
        ],
    },
    TestType {
        name: "Recharge - CashRechargeSimple",
        fields: &[
            text("OperatorID", "Operator ID"),
            text("MDN", "MDN"),
            number("Amount", "Amount"),
        ],
    },
    TestType {
        name: "Adjustment",
        fields: &[
            text("OperatorID", "Operator ID"),
            text("MDN", "MDN"),
            number("Balance", "Balance"),
            number("Amount", "Amount"),
        ],
    },
    TestType {
        name: "ChangeSubOffering",
        fields: &[
            text("BEID", "BEID"),
            text("OperatorID", "Operator ID"),
            text("MDN", "MDN"),
            number("OfferingID", "Offering ID"),
        ],
    },
    TestType {
        name: "Recharge - CashRechargeStar",
        fields: &[
            text("OperatorID", "Operator ID"),
            text("MDN", "MDN"),
            number("Amount", "Amount"),
        ],
    },
];

pub fn find(name: &str) -> Option<&'static TestType> {
    TEST_TYPES.iter().find(|t| t.name == name)
}

/// Fields for `name`; unknown test types have none
pub fn fields_for(name: &str) -> &'static [Field] {
    find(name).map(|t| t.fields).unwrap_or(&[])
}

/// Check a filled-in form and produce the confirmation message
pub fn submit(name: &str, values: &HashMap<String, String>) -> Result<String> {
    let test_type = find(name).ok_or_else(|| Error::NotFound(format!("test type {}", name)))?;

    for field in test_type.fields {
        let value = values.get(field.id).map(|v| v.trim()).unwrap_or("");
        if value.is_empty() {
            if field.required {
                return Err(Error::validation(format!("{} is required", field.label)));
            }
            continue;
        }
        let numeric = value.parse::<f64>().is_ok_and(|n| n.is_finite());
        if field.kind == FieldKind::Number && !numeric {
            return Err(Error::validation(format!("{} must be a number", field.label)));
        }
    }

    Ok(format!("{} test submitted successfully!", name))
}

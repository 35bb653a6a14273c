use crate::commands::Out;
use crate::numeral::to_uppercase_numeral;
use serde::Serialize;

/// The structured output of `invoicer numeral`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumeralOut {
    pub amount: u64,
    pub text: String,
}

/// Prints the uppercase numeral of `amount`.
pub fn numeral(amount: u64) -> Out<NumeralOut> {
    let text = to_uppercase_numeral(amount);
    Out::new(format!("{amount} = {text}"), NumeralOut { amount, text })
}

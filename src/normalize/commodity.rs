//! Commodity shape (MCX_COM)

use super::{derivative_row, normalize_lines, NormalizedFeed};
use crate::model::Exchange;

pub fn normalize(text: &str) -> NormalizedFeed {
    normalize_lines(text, |fields| derivative_row(fields, Exchange::Mcx, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InstrumentType;
    use crate::normalize::test_rows::derivative_row as row;

    #[test]
    fn test_commodity_option() {
        let text = row(
            "4110",
            "GOLD 25 JAN 78000",
            "MCX:GOLD25JAN78000CE",
            "1738195200",
            "78000",
            "CE",
        );

        let out = normalize(&text);
        assert_eq!(out.instruments.len(), 1);

        let opt = &out.instruments[0];
        assert_eq!(opt.symbol, "GOLD25JANCE");
        assert_eq!(opt.exchange, Exchange::Mcx);
        assert_eq!(opt.instrument_type, InstrumentType::CallOption);
        assert_eq!(opt.strike, Some(78000.0));
    }
}

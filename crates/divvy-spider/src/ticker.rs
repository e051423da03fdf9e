/// Translate a TipRanks ticker into its Yahoo Finance symbol.
///
/// The first `.` becomes `-` (share classes), and a `TSE:` exchange prefix becomes the `.TO`
/// suffix:
///
/// ```rust
/// use divvy_spider::ticker::yahoo_ticker;
///
/// assert_eq!(yahoo_ticker("TSE:LGT.A"), "LGT-A.TO");
/// assert_eq!(yahoo_ticker("BRK.B"), "BRK-B");
/// assert_eq!(yahoo_ticker("AAPL"), "AAPL");
/// ```
pub fn yahoo_ticker(tiprank_ticker: &str) -> String {
    let replaced = tiprank_ticker.replacen('.', "-", 1);

    match replaced.split_once(':') {
        Some((exchange, symbol)) if exchange.eq_ignore_ascii_case("TSE") => {
            format!("{symbol}.TO")
        }
        _ => replaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translations() {
        assert_eq!(yahoo_ticker("TSE:LGT.A"), "LGT-A.TO");
        assert_eq!(yahoo_ticker("tse:ENB"), "ENB.TO");
        assert_eq!(yahoo_ticker("TSE:A.B.C"), "A-B.C.TO");
        // other exchanges keep their prefix
        assert_eq!(yahoo_ticker("LON:BP.L"), "LON:BP-L");
    }
}

use anyhow::{Context, Result};
use chrono::NaiveDate;
use hickory_proto::rr::{Name, RecordType};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const USAGE: &str = "usage: dnsvet <to_validate> <support_records> \
[ <trust_anchors> ] [ <yyyy-mm-dd> ] [ <qname> ] [ <qtype> ]";

/// A parsed command line.
///
/// The two file arguments are mandatory; the rest fall back to the built-in
/// trust anchors, the current time, direct record-set validation, and qtype
/// A respectively.
#[derive(Debug)]
pub struct Invocation {
    pub to_validate: PathBuf,
    pub support: PathBuf,
    pub trust_anchors: Option<PathBuf>,
    pub at: SystemTime,
    pub query: Option<(Name, RecordType)>,
}

impl Invocation {
    /// Parses the arguments after the program name. Format errors are
    /// reported before any file is touched.
    pub fn from_args(args: &[String]) -> Result<Invocation> {
        let to_validate = PathBuf::from(&args[0]);
        let support = PathBuf::from(&args[1]);
        let trust_anchors = args.get(2).map(PathBuf::from);

        let at = match args.get(3) {
            Some(date) => parse_date(date).context("Could not parse date string")?,
            None => SystemTime::now(),
        };

        let query = match args.get(4) {
            Some(qname) => {
                let qname = Name::from_str(qname).context("Could not parse qname")?;
                let qtype = match args.get(5) {
                    Some(qtype) => RecordType::from_str(&qtype.to_uppercase())
                        .context("Could not parse qtype")?,
                    None => RecordType::A,
                };
                Some((qname, qtype))
            }
            None => None,
        };

        Ok(Invocation {
            to_validate,
            support,
            trust_anchors,
            at,
            query,
        })
    }
}

/// Midnight UTC on the given day.
fn parse_date(s: &str) -> Result<SystemTime> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")?;
    let secs = date
        .and_hms_opt(0, 0, 0)
        .context("invalid time of day")?
        .and_utc()
        .timestamp();
    let secs = u64::try_from(secs).context("date predates the epoch")?;
    Ok(UNIX_EPOCH + Duration::from_secs(secs))
}

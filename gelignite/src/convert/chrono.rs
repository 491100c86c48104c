use std::time::SystemTime;

use ::chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};

use super::{FromAttributeValue, IntoAttributeValue};
use crate::{AttributeValue, AttributeValueType, Error, Result};

fn parse_rfc3339(av: &AttributeValue) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(av.as_s()?).map_err(|e| Error::Parse(Box::new(e)))
}

macro_rules! convert_datetime {
    ($tz:ident) => {
        impl FromAttributeValue for DateTime<$tz> {
            fn try_from_av(av: &AttributeValue) -> Result<Self> {
                parse_rfc3339(av).map(|dt| dt.with_timezone(&$tz))
            }
        }

        impl IntoAttributeValue for DateTime<$tz> {
            const VALUE_TYPE: AttributeValueType = AttributeValueType::S;

            fn to_av(&self) -> Result<AttributeValue> {
                Ok(AttributeValue::S(self.to_rfc3339()))
            }
        }
    };
}

convert_datetime!(Utc);
convert_datetime!(Local);

impl FromAttributeValue for DateTime<FixedOffset> {
    fn try_from_av(av: &AttributeValue) -> Result<Self> {
        parse_rfc3339(av)
    }
}

impl IntoAttributeValue for DateTime<FixedOffset> {
    const VALUE_TYPE: AttributeValueType = AttributeValueType::S;

    fn to_av(&self) -> Result<AttributeValue> {
        Ok(AttributeValue::S(self.to_rfc3339()))
    }
}

// ISO-8601 calendar date, eg 2021-07-21
impl FromAttributeValue for NaiveDate {
    fn try_from_av(av: &AttributeValue) -> Result<Self> {
        av.as_s()?.parse().map_err(|e| Error::Parse(Box::new(e)))
    }
}

impl IntoAttributeValue for NaiveDate {
    const VALUE_TYPE: AttributeValueType = AttributeValueType::S;

    fn to_av(&self) -> Result<AttributeValue> {
        Ok(AttributeValue::S(self.to_string()))
    }
}

impl FromAttributeValue for SystemTime {
    fn try_from_av(av: &AttributeValue) -> Result<Self> {
        parse_rfc3339(av).map(Self::from)
    }
}

impl IntoAttributeValue for SystemTime {
    const VALUE_TYPE: AttributeValueType = AttributeValueType::S;

    fn to_av(&self) -> Result<AttributeValue> {
        DateTime::<Utc>::from(*self).to_av()
    }
}

#[cfg(test)]
mod tests {
    use ::chrono::{DateTime, NaiveDate, TimeZone, Utc};

    use crate::{
        convert::{FromAttributeValue, IntoAttributeValue},
        AttributeValue, Error,
    };

    #[test]
    fn datetimes_are_rfc3339() {
        let dt = Utc.ymd(2021, 7, 21).and_hms(21, 0, 0);
        let av = dt.to_av().unwrap();
        assert_eq!(av, AttributeValue::S("2021-07-21T21:00:00+00:00".to_owned()));
        assert_eq!(DateTime::<Utc>::try_from_av(&av).unwrap(), dt);
    }

    #[test]
    fn dates() {
        let av = AttributeValue::S("2021-07-21".to_owned());
        assert_eq!(NaiveDate::try_from_av(&av).unwrap(), NaiveDate::from_ymd(2021, 7, 21));
        assert!(matches!(
            NaiveDate::try_from_av(&AttributeValue::S("21/07/2021".to_owned())),
            Err(Error::Parse(_))
        ));
    }
}

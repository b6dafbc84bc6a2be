use chrono::{Datelike, NaiveDate};
use crossterm::event::KeyCode;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DatePart {
    Year,
    Month,
    Day,
}

impl DatePart {
    fn width(self) -> usize {
        match self {
            DatePart::Year => 4,
            DatePart::Month | DatePart::Day => 2,
        }
    }

    fn placeholder(self) -> &'static str {
        match self {
            DatePart::Year => "[YYYY]",
            DatePart::Month => "[MM]",
            DatePart::Day => "[DD]",
        }
    }
}

/// Segment-by-segment date entry: type the digits of one part, the date
/// updates once the part is complete and valid.
#[derive(Debug, Clone)]
pub struct DateInputState {
    pub date: NaiveDate,
    pub editing: bool,
    pub date_part: DatePart,
    digits: String,
}

impl DateInputState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            editing: false,
            date_part: DatePart::Year,
            digits: String::new(),
        }
    }

    pub fn start_editing(&mut self, date: NaiveDate) {
        self.date = date;
        self.editing = true;
        self.date_part = DatePart::Year;
        self.digits.clear();
    }

    pub fn stop_editing(&mut self) {
        self.editing = false;
        self.digits.clear();
    }

    pub fn next_date_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Year => DatePart::Month,
            DatePart::Month => DatePart::Day,
            DatePart::Day => DatePart::Year,
        };
        self.digits.clear();
    }

    pub fn previous_date_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Year => DatePart::Day,
            DatePart::Month => DatePart::Year,
            DatePart::Day => DatePart::Month,
        };
        self.digits.clear();
    }

    /// Returns true when the key changed the date.
    pub fn handle_input(&mut self, key: KeyCode) -> bool {
        if !self.editing {
            return false;
        }

        match key {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.digits.push(c);
                if self.digits.len() < self.date_part.width() {
                    return false;
                }

                let updated = self.digits.parse::<u32>().ok().and_then(|value| self.with_part(value));
                self.digits.clear();

                match updated {
                    Some(date) if date != self.date => {
                        self.date = date;
                        // a complete part moves on to the next one
                        self.next_date_part();
                        true
                    }
                    Some(_) => {
                        self.next_date_part();
                        false
                    }
                    None => false,
                }
            }
            KeyCode::Backspace => {
                self.digits.pop();
                false
            }
            KeyCode::Right => {
                self.next_date_part();
                false
            }
            KeyCode::Left => {
                self.previous_date_part();
                false
            }
            _ => false,
        }
    }

    // Year and month changes clamp the day to the end of the target month
    fn with_part(&self, value: u32) -> Option<NaiveDate> {
        match self.date_part {
            DatePart::Year => {
                let year = i32::try_from(value).ok().filter(|y| (1900..=2100).contains(y))?;
                clamped_date(year, self.date.month(), self.date.day())
            }
            DatePart::Month => {
                if !(1..=12).contains(&value) {
                    return None;
                }
                clamped_date(self.date.year(), value, self.date.day())
            }
            DatePart::Day => self.date.with_day(value),
        }
    }

    pub fn get_display_string(&self) -> String {
        let year = format!("{:04}", self.date.year());
        let month = format!("{:02}", self.date.month());
        let day = format!("{:02}", self.date.day());

        if !self.editing {
            return format!("{year}-{month}-{day}");
        }

        let cursor = if self.digits.is_empty() {
            self.date_part.placeholder().to_string()
        } else {
            format!("[{}]", self.digits)
        };

        match self.date_part {
            DatePart::Year => format!("{year}{cursor}-{month}-{day}"),
            DatePart::Month => format!("{year}-{month}{cursor}-{day}"),
            DatePart::Day => format!("{year}-{month}-{day}{cursor}"),
        }
    }
}

fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    (day.min(28)..=day)
        .rev()
        .find_map(|day| NaiveDate::from_ymd_opt(year, month, day))
}

use serde::Serialize;

/// One page of a counted result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub per_page: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageError {
    NotAnInteger,
    Empty,
}

impl Page {
    fn num_pages(count: i64, per_page: i64) -> i64 {
        if count <= 0 {
            1
        } else {
            (count + per_page - 1) / per_page
        }
    }

    /// Strict lookup: the requested page must exist
    pub fn get(count: i64, per_page: i64, requested: Option<&str>) -> Result<Self, PageError> {
        let per_page = per_page.max(1);
        let num_pages = Self::num_pages(count, per_page);
        let number = match requested {
            None => 1,
            Some(raw) => raw.trim().parse::<i64>().map_err(|_| PageError::NotAnInteger)?,
        };
        if number < 1 || number > num_pages {
            return Err(PageError::Empty);
        }
        Ok(Self {
            number,
            num_pages,
            count,
            per_page,
        })
    }

    /// Lenient lookup for pages: garbage means page 1, out of range means
    /// the last page
    pub fn clamped(count: i64, per_page: i64, requested: Option<&str>) -> Self {
        match Self::get(count, per_page, requested) {
            Ok(page) => page,
            Err(PageError::NotAnInteger) => Self::first(count, per_page),
            Err(PageError::Empty) => {
                let first = Self::first(count, per_page);
                Self {
                    number: first.num_pages,
                    ..first
                }
            }
        }
    }

    fn first(count: i64, per_page: i64) -> Self {
        let per_page = per_page.max(1);
        Self {
            number: 1,
            num_pages: Self::num_pages(count, per_page),
            count,
            per_page,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.per_page
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

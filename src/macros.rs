#[macro_export]
macro_rules! record_wo_desc {
    ($e1:expr,$e2:expr) => {{
        use bio::io::fasta::Record;
        Record::with_attrs($e1, None, $e2)
    }};
}

#[macro_export]
macro_rules! record {
    ($e1:expr,$e2:expr,$e3:expr) => {{
        use bio::io::fasta::Record;
        Record::with_attrs($e1, $e2, $e3)
    }};
}

/// Turns a gapped sequence into a mapping from alignment columns to sequence positions.
#[macro_export]
macro_rules! align {
    ($e:expr) => {{
        use $crate::alphabets::GAP;
        let mut i = 0;
        $e.iter()
            .map(|&byte| {
                if byte == GAP {
                    None
                } else {
                    i += 1;
                    Some(i - 1)
                }
            })
            .collect::<Vec<_>>()
    }};
}

mod xml_tests;
